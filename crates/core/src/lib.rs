pub mod errors;
pub mod models;
pub mod traits;

pub use errors::*;
pub use models::{
    Address, AddressId, ContactInformation, ContactMedium, ContactTag, Deviation,
    DirectoryUser, GroupId, MailContact, MailGroupMember, MembershipRecord, NewDirectoryUser,
    Person, PersonId, PhoneBookContact, UserAttributes, UserDelta, UserField,
};
pub use traits::{DirectoryService, MailContacts, PhoneBook, Reporter, SourceDirectory};
