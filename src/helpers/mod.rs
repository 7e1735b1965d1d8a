//! Low-level helpers shared by the spreadsheet readers
pub(crate) mod reader;
pub(crate) mod xml;
pub(crate) mod zip;
