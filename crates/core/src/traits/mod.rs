//! 外部协作方接口
//!
//! 调度核心只通过这些接口访问外部系统。所有实现在超时、HTTP 错误或协议错误时
//! 返回 [`SyncError::CollaboratorUnavailable`](crate::SyncError::CollaboratorUnavailable)。

pub mod directory;
pub mod mail_contacts;
pub mod phone_book;
pub mod reporter;
pub mod source;

pub use directory::DirectoryService;
pub use mail_contacts::MailContacts;
pub use phone_book::PhoneBook;
pub use reporter::Reporter;
pub use source::SourceDirectory;
