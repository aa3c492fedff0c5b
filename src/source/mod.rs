//! Source position resolution: locating the files defining a class and the
//! declaration spans of its members.
//!
//! Some report schemas carry no line positions for methods and properties.
//! The preprocessors recover them in two steps: [`locator`] maps a fully
//! qualified type name to candidate `.rs` files, [`resolver`] parses a
//! candidate and returns the declaration's line span. Both are best-effort;
//! every failure degrades to "no data".

pub mod locator;
pub mod resolver;

pub use locator::{ClassSearcher, ClassSearcherFactory, CompositeClassSearcher};
pub use resolver::{MemberSpec, SourcePositionResolver, SourceSpan, SymbolSpec};
