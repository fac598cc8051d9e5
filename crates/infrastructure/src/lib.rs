//! 外部系统客户端
//!
//! 每个客户端实现 `syncer-core` 中对应的协作方接口，
//! 网络、协议和 HTTP 状态错误统一映射为 `SyncError::CollaboratorUnavailable`。

pub mod active_directory;
pub mod ews;
mod http;
pub mod procurat;
pub mod reporting;
pub mod starface;

pub use active_directory::LdapDirectory;
pub use ews::EwsMailContacts;
pub use procurat::ProcuratClient;
pub use reporting::{CompositeReporter, LogReporter, WebhookReporter};
pub use starface::StarfaceClient;
