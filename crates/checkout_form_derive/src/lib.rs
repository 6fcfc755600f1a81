use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Type, parse_macro_input};

#[proc_macro_derive(FormModel, attributes(form_model))]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            input.ident,
            "FormModel derive currently supports only non-generic structs",
        )
        .to_compile_error()
        .into();
    }

    let field_enum = match parse_field_enum(&input.attrs) {
        Ok(value) => value,
        Err(error) => return error.to_compile_error().into(),
    };

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return syn::Error::new(
                    Span::call_site(),
                    "FormModel derive requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new(
                Span::call_site(),
                "FormModel derive is only supported on structs",
            )
            .to_compile_error()
            .into();
        }
    };

    let checkout = checkout_path();
    let mut lens_defs = Vec::new();
    let mut fields_methods = Vec::new();
    let mut columns = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let field_ty = field.ty;
        let field_name = field_ident.to_string();
        let lens_ident = format_ident!("{model_ident}{}Lens", to_pascal_case(&field_name));

        lens_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #lens_ident;

            impl #checkout::form::FieldLens<#model_ident> for #lens_ident {
                type Value = #field_ty;

                fn key(self) -> #checkout::form::FieldKey {
                    #checkout::form::FieldKey::new(#field_name)
                }

                fn get<'a>(self, model: &'a #model_ident) -> &'a Self::Value {
                    &model.#field_ident
                }

                fn set(self, model: &mut #model_ident, value: Self::Value) {
                    model.#field_ident = value;
                }
            }
        });

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #lens_ident {
                #lens_ident
            }
        });

        columns.push((field_ident, field_name, field_ty));
    }

    let field_keys = columns.iter().map(|(_, name, _)| {
        quote!(#checkout::form::FieldKey::new(#name))
    });

    let enum_def = match field_enum {
        Some(enum_ident) => match field_enum_tokens(&checkout, &model_ident, &enum_ident, &columns)
        {
            Ok(tokens) => tokens,
            Err(error) => return error.to_compile_error().into(),
        },
        None => TokenStream2::new(),
    };

    quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#fields_methods)*
        }

        impl #checkout::form::FormModel for #model_ident {
            type Fields = #fields_struct_ident;

            const FIELD_KEYS: &'static [#checkout::form::FieldKey] = &[#(#field_keys),*];

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }
        }

        #(#lens_defs)*

        #enum_def
    }
    .into()
}

fn parse_field_enum(attrs: &[Attribute]) -> syn::Result<Option<Ident>> {
    let mut field_enum = None;
    for attr in attrs {
        if !attr.path().is_ident("form_model") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("field_enum") {
                let ident: Ident = meta.value()?.parse()?;
                field_enum = Some(ident);
                Ok(())
            } else {
                Err(meta.error("unsupported form_model attribute"))
            }
        })?;
    }
    Ok(field_enum)
}

fn field_enum_tokens(
    checkout: &TokenStream2,
    model_ident: &Ident,
    enum_ident: &Ident,
    columns: &[(Ident, String, Type)],
) -> syn::Result<TokenStream2> {
    let Some((_, _, value_ty)) = columns.first() else {
        return Err(syn::Error::new_spanned(
            enum_ident,
            "field_enum requires at least one field",
        ));
    };
    let expected = quote!(#value_ty).to_string();
    for (ident, _, ty) in columns {
        if quote!(#ty).to_string() != expected {
            return Err(syn::Error::new_spanned(
                ident,
                "field_enum requires every field to share the same type",
            ));
        }
    }

    let variants = columns
        .iter()
        .map(|(ident, _, _)| format_ident!("{}", to_pascal_case(&ident.to_string())))
        .collect::<Vec<_>>();
    let names = columns.iter().map(|(_, name, _)| name).collect::<Vec<_>>();
    let idents = columns.iter().map(|(ident, _, _)| ident).collect::<Vec<_>>();
    let count = variants.len();

    Ok(quote! {
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub enum #enum_ident {
            #(#variants),*
        }

        impl #enum_ident {
            pub const ALL: [Self; #count] = [#(Self::#variants),*];

            pub const fn as_str(self) -> &'static str {
                match self {
                    #(Self::#variants => #names),*
                }
            }

            pub const fn key(self) -> #checkout::form::FieldKey {
                #checkout::form::FieldKey::new(self.as_str())
            }

            pub fn from_key(key: #checkout::form::FieldKey) -> Option<Self> {
                Self::ALL.into_iter().find(|field| field.as_str() == key.as_str())
            }
        }

        impl ::std::fmt::Display for #enum_ident {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for #enum_ident {
            type Err = #checkout::form::UnknownField;

            fn from_str(value: &str) -> ::std::result::Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|field| field.as_str() == value)
                    .ok_or_else(|| #checkout::form::UnknownField(value.to_string()))
            }
        }

        impl #checkout::form::FieldLens<#model_ident> for #enum_ident {
            type Value = #value_ty;

            fn key(self) -> #checkout::form::FieldKey {
                #enum_ident::key(self)
            }

            fn get<'a>(self, model: &'a #model_ident) -> &'a Self::Value {
                match self {
                    #(Self::#variants => &model.#idents),*
                }
            }

            fn set(self, model: &mut #model_ident, value: Self::Value) {
                match self {
                    #(Self::#variants => model.#idents = value),*
                }
            }
        }
    })
}

fn checkout_path() -> TokenStream2 {
    match crate_name("storefront_checkout") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::storefront_checkout),
    }
}

fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for segment in input.split('_') {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
