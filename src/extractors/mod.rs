//! Request extractors: `/web` addresses and the form digest header.

pub mod list_address;
pub mod request_digest;

pub use list_address::{ListAddress, ListResource, UserResource, WebAddress};
pub use request_digest::{RequestDigest, FORM_DIGEST_VALUE, REQUEST_DIGEST_HEADER};
