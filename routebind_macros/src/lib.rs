use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr, Path, Result as SynResult, Token};

enum SourceKind {
    Form,
    Cookie,
    Header,
    Session,
}

struct FieldAttrs {
    source: SourceKind,
    key: Option<LitStr>,
    skip: bool,
}

fn parse_field_attrs(field: &syn::Field) -> SynResult<FieldAttrs> {
    let mut parsed = FieldAttrs {
        source: SourceKind::Form,
        key: None,
        skip: false,
    };
    for attr in &field.attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let source = if meta.path.is_ident("cookie") {
                Some(SourceKind::Cookie)
            } else if meta.path.is_ident("header") {
                Some(SourceKind::Header)
            } else if meta.path.is_ident("session") {
                Some(SourceKind::Session)
            } else {
                None
            };
            if let Some(source) = source {
                parsed.source = source;
                if meta.input.peek(Token![=]) {
                    parsed.key = Some(meta.value()?.parse()?);
                }
                return Ok(());
            }
            if meta.path.is_ident("name") {
                parsed.key = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("skip") {
                parsed.skip = true;
                return Ok(());
            }
            Err(meta.error("expected one of: cookie, header, session, name, skip"))
        })?;
    }
    Ok(parsed)
}

#[derive(Default)]
struct StructAttrs {
    construct: Option<Path>,
    json: bool,
}

fn parse_struct_attrs(input: &DeriveInput) -> SynResult<StructAttrs> {
    let mut parsed = StructAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("construct") {
                parsed.construct = Some(meta.value()?.parse::<Path>()?);
                return Ok(());
            }
            if meta.path.is_ident("json") {
                parsed.json = true;
                return Ok(());
            }
            Err(meta.error("expected `construct = path::to::fn` or `json`"))
        })?;
    }
    Ok(parsed)
}

/// `user_id` -> `UserId`, which is how the key resolver expects declared names.
fn declared_name(ident: &Ident) -> String {
    let raw = ident.to_string();
    let raw = raw.strip_prefix("r#").unwrap_or(&raw);
    let mut out = String::with_capacity(raw.len());
    let mut upper = true;
    for c in raw.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn expand(input: &DeriveInput) -> SynResult<TokenStream2> {
    let name = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "Bindable can only be derived for structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            name,
            "Bindable requires a struct with named fields",
        ));
    };

    let mut rules = Vec::new();
    for field in &fields.named {
        let attrs = parse_field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = &field.ident else { continue };
        let declared = declared_name(ident);
        let source = match attrs.source {
            SourceKind::Form => format_ident!("Form"),
            SourceKind::Cookie => format_ident!("Cookie"),
            SourceKind::Header => format_ident!("Header"),
            SourceKind::Session => format_ident!("Session"),
        };
        let key = match &attrs.key {
            Some(lit) => quote! { ::core::option::Option::Some(#lit) },
            None => quote! { ::core::option::Option::None },
        };
        rules.push(quote! {
            schema.field(
                ::routebind::binder::FieldSpec::new(
                    #declared,
                    ::routebind::binder::Source::#source,
                    #key,
                ),
                |record: &mut Self| &mut record.#ident,
            );
        });
    }

    let struct_attrs = parse_struct_attrs(input)?;
    if struct_attrs.json {
        rules.push(quote! {
            schema.json();
        });
    }
    let construct = struct_attrs.construct.map(|path| {
        quote! {
            fn construct(&mut self, ctx: &::routebind::dispatcher::RequestContext) {
                #path(self, ctx)
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::routebind::binder::Bindable for #name #ty_generics #where_clause {
            fn describe(schema: &mut ::routebind::binder::SchemaBuilder<'_, Self>) {
                #(#rules)*
            }

            #construct
        }

        impl #impl_generics ::routebind::binder::BindField for #name #ty_generics #where_clause {
            fn attach<__R, __F>(
                schema: &mut ::routebind::binder::SchemaBuilder<'_, __R>,
                _spec: ::routebind::binder::FieldSpec,
                project: __F,
            )
            where
                __R: 'static,
                __F: Fn(&mut __R) -> &mut Self + Send + Sync + 'static,
            {
                schema.nested(project);
            }
        }
    })
}

/// Derive `routebind::binder::Bindable` (and `BindField`, so the record can be
/// nested in another one).
///
/// Field attributes:
///
/// - `#[bind(cookie)]`, `#[bind(header)]`, `#[bind(session)]` pick the source,
///   optionally with an explicit key: `#[bind(cookie = "sid")]`
/// - `#[bind(name = "uid")]` sets the key for the default path/form source
/// - `"~"` as a key means "use the conventional keys"
/// - `#[bind(skip)]` leaves the field at its default
///
/// Struct attributes:
///
/// - `#[bind(construct = path)]` names a `fn(&mut Self, &RequestContext)` run
///   after binding
/// - `#[bind(json)]` merges a JSON request body over the bound record; the
///   struct must implement `Serialize` and `Deserialize`
#[proc_macro_derive(Bindable, attributes(bind))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
