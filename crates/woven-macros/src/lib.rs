//! # woven-macros
//!
//! Attributes that only carry information for the weaver. Both expand to the
//! annotated item unchanged.
//!
//! - `#[advised]` is written by the weaver on every member it has woven and
//!   is how a second weaving pass recognises them.
//! - `#[annotate(Cached, Audit)]` attaches annotation names that pointcuts can
//!   select with `has-annotation(Cached)`.

#![forbid(unsafe_code)]

use proc_macro::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Path, Token};

/// Marks a method as already woven.
///
/// ```ignore
/// #[woven::advised]
/// pub fn charge(&self, amount: u64) -> u64 { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn advised(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr = proc_macro2::TokenStream::from(attr);
    if !attr.is_empty() {
        return syn::Error::new_spanned(attr, "`advised` takes no arguments")
            .to_compile_error()
            .into();
    }
    item
}

/// Attaches annotation names to an item for pointcut matching.
///
/// ```ignore
/// #[woven::annotate(Cached, Transactional)]
/// pub fn find(&self, id: u64) -> Option<User> { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn annotate(attr: TokenStream, item: TokenStream) -> TokenStream {
    let parser = Punctuated::<Path, Token![,]>::parse_terminated;
    match parser.parse(attr) {
        Ok(names) if !names.is_empty() => item,
        Ok(_) => {
            let item = proc_macro2::TokenStream::from(item);
            quote! {
                ::core::compile_error!("`annotate` needs at least one annotation name");
                #item
            }
            .into()
        }
        Err(e) => e.to_compile_error().into(),
    }
}
