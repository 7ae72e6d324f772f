extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ItemFn};

/// Runs the annotated async method inside a MongoDB transaction.
///
/// The method must take a `session: &mut Session` argument. The body is
/// moved into a companion `<name>_in_tx` method; the original name becomes
/// a wrapper that starts a transaction, commits on `Ok` and aborts on
/// `Err` before propagating it.
#[proc_macro_attribute]
pub fn tx(_args: TokenStream, input: TokenStream) -> TokenStream {
    let func = parse_macro_input!(input as ItemFn);
    let vis = &func.vis;
    let body = &func.block;
    let name = &func.sig.ident;
    let inputs = &func.sig.inputs;
    let output = &func.sig.output;

    let body_fn = format_ident!("{}_in_tx", name);
    let forwarded = inputs.iter().map(|arg| match arg {
        FnArg::Receiver(_) => quote!(self),
        FnArg::Typed(typed) => {
            let pat = &typed.pat;
            quote!(#pat)
        }
    });

    let expanded = quote! {
        #vis async fn #body_fn(#inputs) #output #body

        #vis async fn #name(#inputs) #output {
            session.start_transaction().await?;
            match Self::#body_fn(#(#forwarded),*).await {
                Ok(value) => {
                    session.commit_transaction().await?;
                    Ok(value)
                }
                Err(err) => {
                    session.abort_transaction().await?;
                    Err(err)
                }
            }
        }
    };

    expanded.into()
}
