//! Declaration-span resolution through the real syntax tree.
//!
//! Given a source file and a symbolic member reference, parses the file with
//! `syn` and returns the 1-based inclusive line span of the first matching
//! declaration. Preprocessing resolves many symbols against the same file in
//! a row, so the parse result of the most recently requested file is kept in
//! a single-entry cache. The cache holds a plain-data declaration index, not
//! the syntax tree itself: `proc-macro2` spans are not `Send`, and the
//! resolver is shared across parser threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use syn::spanned::Spanned;

/// 1-based inclusive line span of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: u32,
    pub end: u32,
}

/// Which member of a type is being looked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberSpec {
    /// A method or associated function by exact name (`new` for
    /// constructors).
    Method(String),
    /// A property getter: matches `name` or `get_name`.
    Getter(String),
    /// A property setter: matches `set_name`.
    Setter(String),
    /// The type declaration itself.
    TypeDecl,
}

/// A symbolic reference to a declaration.
///
/// With a type name, methods are searched in that type's `impl` blocks; with
/// `None`, free functions are matched instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSpec {
    pub type_name: Option<String>,
    pub member: MemberSpec,
}

impl SymbolSpec {
    pub fn method(type_name: Option<&str>, name: &str) -> Self {
        Self {
            type_name: type_name.map(str::to_string),
            member: MemberSpec::Method(name.to_string()),
        }
    }

    pub fn getter(type_name: Option<&str>, name: &str) -> Self {
        Self {
            type_name: type_name.map(str::to_string),
            member: MemberSpec::Getter(name.to_string()),
        }
    }

    pub fn setter(type_name: Option<&str>, name: &str) -> Self {
        Self {
            type_name: type_name.map(str::to_string),
            member: MemberSpec::Setter(name.to_string()),
        }
    }

    pub fn type_decl(type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            member: MemberSpec::TypeDecl,
        }
    }
}

/// Declarations extracted from one parsed file, in document order.
#[derive(Debug, Default)]
struct FileIndex {
    /// Functions: owning type (None for free functions) + name + span.
    functions: Vec<(Option<String>, String, SourceSpan)>,
    /// Type declarations: name + span.
    types: Vec<(String, SourceSpan)>,
}

/// Resolves declaration spans, caching the index of the last parsed file.
#[derive(Debug, Default)]
pub struct SourcePositionResolver {
    cache: Mutex<Option<(PathBuf, Arc<FileIndex>)>>,
}

impl SourcePositionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The line span of the first declaration matching `symbol`, or `None`.
    ///
    /// Unreadable or unparseable files degrade to `None`; position
    /// enrichment is best-effort and never fails the caller.
    pub fn find_declaration_span(&self, path: &Path, symbol: &SymbolSpec) -> Option<SourceSpan> {
        let index = self.index_of(path)?;

        if symbol.member == MemberSpec::TypeDecl {
            let wanted = symbol.type_name.as_deref()?;
            return index
                .types
                .iter()
                .find(|(name, _)| name == wanted)
                .map(|(_, span)| *span);
        }

        index
            .functions
            .iter()
            .find(|(owner, name, _)| {
                owner.as_deref() == symbol.type_name.as_deref()
                    && matches_member(name, &symbol.member)
            })
            .map(|(_, _, span)| *span)
    }

    fn index_of(&self, path: &Path) -> Option<Arc<FileIndex>> {
        {
            let slot = self.cache.lock();
            if let Some((cached_path, index)) = slot.as_ref() {
                if cached_path == path {
                    return Some(Arc::clone(index));
                }
            }
        }

        // Parse outside the lock: a stale cache entry only costs a duplicate
        // parse, while holding the lock would serialize unrelated threads.
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("cannot read {}: {e}", path.display());
                return None;
            }
        };

        let ast = match syn::parse_file(&content) {
            Ok(ast) => ast,
            Err(e) => {
                log::debug!("cannot parse {}: {e}", path.display());
                return None;
            }
        };

        let mut index = FileIndex::default();
        index_items(&ast.items, &mut index);
        let index = Arc::new(index);

        *self.cache.lock() = Some((path.to_path_buf(), Arc::clone(&index)));
        Some(index)
    }
}

fn index_items(items: &[syn::Item], index: &mut FileIndex) {
    for item in items {
        match item {
            syn::Item::Fn(item_fn) => {
                index.functions.push((
                    None,
                    item_fn.sig.ident.to_string(),
                    SourceSpan {
                        start: item_fn.span().start().line as u32,
                        end: item_fn.block.brace_token.span.close().start().line as u32,
                    },
                ));
            }
            syn::Item::Impl(item_impl) => {
                let Some(type_name) = impl_self_type(item_impl) else {
                    continue;
                };
                for impl_item in &item_impl.items {
                    if let syn::ImplItem::Fn(impl_fn) = impl_item {
                        index.functions.push((
                            Some(type_name.clone()),
                            impl_fn.sig.ident.to_string(),
                            SourceSpan {
                                start: impl_fn.span().start().line as u32,
                                end: impl_fn.block.brace_token.span.close().start().line as u32,
                            },
                        ));
                    }
                }
            }
            syn::Item::Struct(s) => index.types.push((s.ident.to_string(), span_of(s))),
            syn::Item::Enum(e) => index.types.push((e.ident.to_string(), span_of(e))),
            syn::Item::Trait(t) => index.types.push((t.ident.to_string(), span_of(t))),
            syn::Item::Union(u) => index.types.push((u.ident.to_string(), span_of(u))),
            syn::Item::Mod(m) => {
                if let Some((_, items)) = &m.content {
                    index_items(items, index);
                }
            }
            _ => {}
        }
    }
}

/// Final path segment of an impl block's self type.
fn impl_self_type(item_impl: &syn::ItemImpl) -> Option<String> {
    let syn::Type::Path(type_path) = item_impl.self_ty.as_ref() else {
        return None;
    };

    type_path
        .path
        .segments
        .last()
        .map(|segment| segment.ident.to_string())
}

fn matches_member(fn_name: &str, member: &MemberSpec) -> bool {
    match member {
        MemberSpec::Method(name) => fn_name == name,
        MemberSpec::Getter(name) => fn_name == name || fn_name == format!("get_{name}"),
        MemberSpec::Setter(name) => fn_name == format!("set_{name}"),
        MemberSpec::TypeDecl => false,
    }
}

fn span_of<T: Spanned>(item: &T) -> SourceSpan {
    let span = item.span();
    SourceSpan {
        start: span.start().line as u32,
        end: span.end().line as u32,
    }
}
