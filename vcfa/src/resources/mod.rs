//! Resource implementations

pub mod resource_content_library;
pub mod resource_org;

pub use resource_content_library::ContentLibraryResource;
pub use resource_org::OrgResource;
