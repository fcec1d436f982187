//! Data source implementations

pub mod data_source_content_library;
pub mod data_source_org;
pub mod data_source_right;

pub use data_source_content_library::ContentLibraryDataSource;
pub use data_source_org::OrgDataSource;
pub use data_source_right::RightDataSource;
