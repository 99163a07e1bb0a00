use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(FormFields)]
pub fn derive_form_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            input.ident,
            "FormFields derive currently supports only non-generic structs",
        )
        .to_compile_error()
        .into();
    }

    let model_ident = input.ident;
    let keys_struct_ident = format_ident!("{model_ident}Keys");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return syn::Error::new(
                    Span::call_site(),
                    "FormFields derive requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new(
                Span::call_site(),
                "FormFields derive is only supported on structs",
            )
            .to_compile_error()
            .into();
        }
    };

    let calmstate = calmstate_path();
    let mut key_methods = Vec::new();
    let mut key_consts = Vec::new();
    let mut initial_entries = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let field_name = field_ident.to_string();

        key_methods.push(quote! {
            pub const fn #field_ident(&self) -> #calmstate::form::FieldKey {
                #calmstate::form::FieldKey::new(#field_name)
            }
        });

        key_consts.push(quote! {
            #calmstate::form::FieldKey::new(#field_name)
        });

        initial_entries.push(quote! {
            (
                #calmstate::form::FieldKey::new(#field_name),
                ::core::convert::Into::<#calmstate::form::FieldValue>::into(self.#field_ident),
            )
        });
    }

    quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #keys_struct_ident;

        impl #keys_struct_ident {
            #(#key_methods)*
        }

        impl #calmstate::form::FormFields for #model_ident {
            type Keys = #keys_struct_ident;

            const FIELDS: &'static [#calmstate::form::FieldKey] = &[#(#key_consts),*];

            fn keys() -> Self::Keys {
                #keys_struct_ident
            }

            fn initial_values(self) -> ::std::vec::Vec<(
                #calmstate::form::FieldKey,
                #calmstate::form::FieldValue,
            )> {
                ::std::vec![#(#initial_entries),*]
            }
        }
    }
    .into()
}

fn calmstate_path() -> TokenStream2 {
    match crate_name("calmstate") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::calmstate),
    }
}
