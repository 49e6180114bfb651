use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod annotate;
pub mod cancel;
pub mod candidate;
pub mod catalog;
pub mod comment;
pub mod completion;
pub mod document;
pub mod pluralize;
pub mod position;
pub mod provider;
pub mod refactor;
pub mod scaffold;
pub mod sync;
pub mod template;
pub mod transaction;

pub type Tendril = SmartString<LazyCompact>;
