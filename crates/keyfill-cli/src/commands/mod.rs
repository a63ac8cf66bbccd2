pub mod add;
pub mod completion;
pub mod fill;
pub mod list;
pub mod remove;
pub mod tabs;
