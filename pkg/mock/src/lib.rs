//! Procedural macros for generating mock implementations.
//!
//! # api_client
//!
//! Generates a mock implementation for an async API client trait.
//!
//! Put `#[cfg_attr(feature = "mock", mock::api_client)]` before `#[async_trait]`
//! so the mock is only compiled when a test crate asks for it:
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! #[cfg_attr(feature = "mock", mock::api_client)]
//! #[async_trait]
//! pub trait IdentityApi: Send + Sync + 'static {
//!     async fn fetch_dialects(&self) -> Result<Vec<ClaimDialect>, Error>;
//!     async fn fetch_claim_configuration(&self, app_id: &str) -> Result<ClaimConfiguration, Error>;
//! }
//!
//! // Generates:
//! // pub struct MockIdentityApi {
//! //     pub fetch_dialects: Mutex<VecDeque<Result<Vec<ClaimDialect>, Error>>>,
//! //     pub fetch_dialects_call_count: AtomicUsize,
//! //     ...
//! // }
//! // impl Default for MockIdentityApi { ... }
//! // impl MockIdentityApi { fn with_fetch_dialects(self, result) -> Self; fn fetch_dialects_calls(&self) -> usize; ... }
//! // #[async_trait] impl IdentityApi for MockIdentityApi { ... }
//! ```
//!
//! Results are queued: every call pops the next one, so a method that is
//! called twice (load, then reload after a submit) needs two results.
//!
//! ## Checking Call Counts in Tests
//!
//! ```ignore
//! assert_eq!(mock.submit_claim_configuration_calls(), 0);
//! ```

use proc_macro::TokenStream;
use quote::ToTokens;
use quote::{format_ident, quote};
use syn::{FnArg, ItemTrait, ReturnType, TraitItem, parse_macro_input};

/// Generates a mock implementation for an async trait.
#[proc_macro_attribute]
pub fn api_client(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemTrait);
    let trait_name = &input.ident;
    let mock_name = format_ident!("Mock{}", trait_name);
    let vis = &input.vis;

    let mut field_definitions = Vec::new();
    let mut default_fields = Vec::new();
    let mut impl_methods = Vec::new();
    let mut helper_methods = Vec::new();

    for item in &input.items {
        if let TraitItem::Fn(method) = item {
            let method_name = &method.sig.ident;
            let call_count_field = format_ident!("{}_call_count", method_name);
            let call_count_method = format_ident!("{}_calls", method_name);
            let with_method = format_ident!("with_{}", method_name);
            let missing = format!("no result queued for {}", method_name);

            let return_type = match &method.sig.output {
                ReturnType::Default => quote! { () },
                ReturnType::Type(_, ty) => quote! { #ty },
            };

            field_definitions.push(quote! {
                pub #method_name: ::tokio::sync::Mutex<::std::collections::VecDeque<#return_type>>
            });

            field_definitions.push(quote! {
                pub #call_count_field: ::std::sync::atomic::AtomicUsize
            });

            default_fields.push(quote! {
                #method_name: ::tokio::sync::Mutex::new(::std::collections::VecDeque::new())
            });

            default_fields.push(quote! {
                #call_count_field: ::std::sync::atomic::AtomicUsize::new(0)
            });

            helper_methods.push(quote! {
                pub fn #with_method(mut self, result: #return_type) -> Self {
                    self.#method_name.get_mut().push_back(result);
                    self
                }

                pub fn #call_count_method(&self) -> usize {
                    self.#call_count_field.load(::std::sync::atomic::Ordering::SeqCst)
                }
            });

            let params: Vec<_> = method
                .sig
                .inputs
                .iter()
                .filter_map(|arg| {
                    if let FnArg::Typed(pat_type) = arg {
                        let ty = &pat_type.ty;
                        let pat_str = pat_type.pat.to_token_stream().to_string();
                        let prefixed_name = format_ident!("_{}", pat_str);
                        Some(quote! { #prefixed_name: #ty })
                    } else {
                        None
                    }
                })
                .collect();

            impl_methods.push(quote! {
                async fn #method_name(&self, #(#params),*) -> #return_type {
                    self.#call_count_field.fetch_add(1, ::std::sync::atomic::Ordering::SeqCst);
                    self.#method_name.lock().await.pop_front().expect(#missing)
                }
            });
        }
    }

    let expanded = quote! {
        #input

        #vis struct #mock_name {
            #(#field_definitions),*
        }

        impl ::std::default::Default for #mock_name {
            fn default() -> Self {
                Self {
                    #(#default_fields),*
                }
            }
        }

        impl #mock_name {
            #(#helper_methods)*
        }

        #[::async_trait::async_trait]
        impl #trait_name for #mock_name {
            #(#impl_methods)*
        }
    };

    TokenStream::from(expanded)
}
