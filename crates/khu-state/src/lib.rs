pub mod db;
pub mod engine;
pub mod khu;
pub mod masternode;
pub mod note;
pub mod proposal;
pub mod undo;

pub use db::StateDb;
pub use engine::StateEngine;
pub use khu::KhuOverlayState;
pub use masternode::{MasternodeRecord, MasternodeStatus};
pub use note::{NoteRecord, NoteStatus};
pub use proposal::{ProposalRecord, ProposalStatus};
pub use undo::BlockUndo;
