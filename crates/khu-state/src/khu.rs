use khu_core::error::KhuError;
use khu_core::types::{Amount, BasisPoints, Height};
use serde::{Deserialize, Serialize};

use khu_core::constants::{BASIS_POINT_SCALE, DAYS_PER_YEAR, TREASURY_T_DIVISOR};

/// The KHU colored-coin monetary overlay. `circulating` is plain base-coin
/// supply; `colored` is the 1:1-backed overlay supply; `uncolored` is the
/// colored supply not currently frozen in a staking note (`colored ==
/// uncolored + locked` always holds). `reserved`/`unreserved` track accrued
/// daily yield not yet paid out to individual notes (`reserved ==
/// unreserved` always holds, by construction — every basis point of accrued
/// yield is mirrored into both counters in the same step).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KhuOverlayState {
    pub colored: Amount,
    pub uncolored: Amount,
    pub locked: Amount,
    pub reserved: Amount,
    pub unreserved: Amount,
    pub treasury: Amount,
    pub r_annual: BasisPoints,
    pub r_next: BasisPoints,
    pub r_max_dynamic: BasisPoints,
    pub last_decay_height: Height,
    pub last_yield_height: Height,
    pub last_treasury_height: Height,
    pub domc_cycle_start: Height,
    pub dao_cycle_start: Height,
}

impl KhuOverlayState {
    pub fn genesis(r_initial: BasisPoints) -> Self {
        Self {
            colored: 0,
            uncolored: 0,
            locked: 0,
            reserved: 0,
            unreserved: 0,
            treasury: 0,
            r_annual: r_initial,
            r_next: r_initial,
            r_max_dynamic: r_initial,
            last_decay_height: 0,
            last_yield_height: 0,
            last_treasury_height: 0,
            domc_cycle_start: 0,
            dao_cycle_start: 0,
        }
    }

    /// `C = U + Z`, `Cr = Ur`, `T >= 0`. Checked after every mutating step.
    pub fn check_invariants(&self) -> Result<(), KhuError> {
        if self.colored != self.uncolored + self.locked {
            return Err(KhuError::InvariantViolation("colored != uncolored + locked"));
        }
        if self.reserved != self.unreserved {
            return Err(KhuError::InvariantViolation("reserved != unreserved"));
        }
        if self.treasury < 0 {
            return Err(KhuError::InvariantViolation("treasury went negative"));
        }
        Ok(())
    }

    pub fn mint(&mut self, amount: Amount) {
        self.colored += amount;
        self.uncolored += amount;
    }

    pub fn redeem(&mut self, amount: Amount) {
        self.colored -= amount;
        self.uncolored -= amount;
    }

    pub fn lock(&mut self, amount: Amount) {
        self.uncolored -= amount;
        self.locked += amount;
    }

    /// The atomic double-flux a matured note's unlock performs: principal
    /// returns from locked to uncolored, and the note's accrued bonus share
    /// is realized by moving it out of the reserved/unreserved counters into
    /// circulating colored supply.
    pub fn unlock(&mut self, principal: Amount, bonus: Amount) {
        self.locked -= principal;
        self.uncolored += principal;
        self.uncolored += bonus;
        self.colored += bonus;
        self.reserved -= bonus;
        self.unreserved -= bonus;
    }

    /// Daily yield accrual: every matured, locked note earns its
    /// proportional share of `r_annual`, mirrored into `reserved` and
    /// `unreserved` together.
    pub fn accrue_daily_yield(&mut self, matured_locked: Amount) -> Amount {
        let bonus = (matured_locked as i128 * self.r_annual as i128
            / (BASIS_POINT_SCALE as i128 * DAYS_PER_YEAR as i128)) as Amount;
        self.reserved += bonus;
        self.unreserved += bonus;
        bonus
    }

    /// Daily treasury accumulation: `T += (U * R_annual) / (10000 * 8 * 365)`.
    pub fn accrue_treasury(&mut self) -> Amount {
        let delta = (self.uncolored as i128 * self.r_annual as i128
            / (BASIS_POINT_SCALE as i128 * TREASURY_T_DIVISOR as i128 * DAYS_PER_YEAR as i128))
            as Amount;
        self.treasury += delta;
        delta
    }

    /// Annual decay toward `r_floor`. `r_annual` itself is untouched here —
    /// it only changes at a DOMC cycle boundary — this recomputes the
    /// dynamic ceiling `r_max_dynamic` fresh from how many decay years have
    /// elapsed since activation, `year(n) = floor(n / blocks_per_year)`.
    pub fn decay_rate(&mut self, r_initial: BasisPoints, r_floor: BasisPoints, r_decay_per_year: BasisPoints, years_elapsed: u32) {
        let decayed = r_initial.saturating_sub(r_decay_per_year.saturating_mul(years_elapsed));
        self.r_max_dynamic = decayed.max(r_floor);
    }
}
