//! Data models for Shelfmark

pub mod author;
pub mod book;
pub mod borrow;
pub mod claim;
pub mod support_message;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use borrow::{Borrow, BorrowDetails, BorrowStatus};
pub use claim::{Claim, ClaimDetails, ClaimStatus, ClaimType};
pub use support_message::SupportMessage;
pub use user::{User, UserClaims, UserStatus, UserSummary};
