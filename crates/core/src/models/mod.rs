pub mod contact;
pub mod deviation;
pub mod directory;
pub mod mail;
pub mod membership;
pub mod person;
pub mod phone_book;

pub use contact::{ContactInformation, ContactMedium};
pub use deviation::Deviation;
pub use directory::{DirectoryUser, NewDirectoryUser, UserAttributes, UserDelta, UserField};
pub use mail::{MailContact, MailGroupMember};
pub use membership::MembershipRecord;
pub use person::{Address, Person};
pub use phone_book::{ContactTag, PhoneBookContact};

/// 数据源中的人员标识
pub type PersonId = i64;
/// 数据源中的分组标识
pub type GroupId = i64;
/// 数据源中的地址标识
pub type AddressId = i64;
