// vim: tw=80
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    *,
    spanned::Spanned
};

/// One method of the mocked trait.
struct Method {
    sig: Signature,
    params: Vec<Ident>,
}

impl Method {
    fn new(tif: &TraitItemFn) -> Result<Self> {
        let sig = &tif.sig;
        if let Some(a) = &sig.asyncness {
            return Err(Error::new(a.span(),
                "async methods are not supported"));
        }
        if sig.generics.type_params().next().is_some()
            || sig.generics.const_params().next().is_some()
        {
            return Err(Error::new(sig.generics.span(),
                "generic methods are not supported"));
        }
        if let Some(v) = &sig.variadic {
            return Err(Error::new(v.span(),
                "variadic methods are not supported"));
        }
        if sig.receiver().is_none() {
            return Err(Error::new(sig.ident.span(),
                "methods without a self receiver are not supported"));
        }
        let mut params = Vec::new();
        for input in sig.inputs.iter() {
            let FnArg::Typed(pt) = input else { continue };
            match (pt.pat.as_ref(), pt.ty.as_ref()) {
                (_, Type::ImplTrait(it)) => return Err(Error::new(it.span(),
                    "impl Trait arguments are not supported")),
                (Pat::Ident(pi), _) if pi.by_ref.is_none()
                    && pi.subpat.is_none() => params.push(pi.ident.clone()),
                (pat, _) => return Err(Error::new(pat.span(),
                    "arguments must be plain names"))
            }
        }
        if let ReturnType::Type(_, ty) = &sig.output {
            match ty.as_ref() {
                Type::Reference(r) => return Err(Error::new(r.span(),
                    "methods returning references are not supported")),
                Type::ImplTrait(it) => return Err(Error::new(it.span(),
                    "methods returning impl Trait are not supported")),
                _ => ()
            }
        }
        Ok(Method { sig: sig.clone(), params })
    }

    /// The `.method(...)` call declaring this method on the `Class`.
    fn declaration(&self) -> TokenStream {
        let name = self.sig.ident.to_string();
        let params = self.params.iter().map(Ident::to_string);
        quote!(.method(#name, &[#(#params),*]))
    }

    /// The forwarding implementation.
    fn forwarder(&self) -> TokenStream {
        let sig = &self.sig;
        let name = self.sig.ident.to_string();
        let params = &self.params;
        quote!(
            #sig {
                #[allow(unused_mut)]
                let mut __understudy_args = ::understudy::Args::new();
                #(__understudy_args.push(::understudy::ToValue::to_value(&#params));)*
                ::understudy::__private::forward(&self.0, #name,
                    __understudy_args)
            }
        )
    }
}

struct Interface {
    vis: Visibility,
    ident: Ident,
    unsafety: Option<Token![unsafe]>,
    methods: Vec<Method>,
}

impl Interface {
    fn new(item: &ItemTrait) -> Result<Self> {
        if !item.generics.params.is_empty()
            || item.generics.where_clause.is_some()
        {
            return Err(Error::new(item.generics.span(),
                "generic traits are not supported"));
        }
        if !item.supertraits.is_empty() {
            return Err(Error::new(item.supertraits.span(),
                "supertraits are not supported"));
        }
        let mut methods = Vec::new();
        for ti in item.items.iter() {
            match ti {
                TraitItem::Fn(tif) => methods.push(Method::new(tif)?),
                _ => return Err(Error::new(ti.span(),
                    "only methods can be mocked"))
            }
        }
        Ok(Interface {
            vis: item.vis.clone(),
            ident: item.ident.clone(),
            unsafety: item.unsafety,
            methods,
        })
    }

    fn gen(&self) -> TokenStream {
        let vis = &self.vis;
        let ident = &self.ident;
        let name = ident.to_string();
        let mock_ident = format_ident!("Mock{}", ident);
        let doc = format!("Mock implementation of [`{ident}`]");
        let unsafety = &self.unsafety;
        let declarations = self.methods.iter().map(Method::declaration);
        let forwarders = self.methods.iter().map(Method::forwarder);
        quote!(
            #[doc = #doc]
            #[derive(Clone, Debug)]
            #vis struct #mock_ident(::understudy::Mock);

            #[allow(dead_code)]
            impl #mock_ident {
                #[doc = "The interface this mock stands in for"]
                #vis fn interface() -> ::understudy::Class {
                    ::understudy::Class::new(#name, ::core::module_path!())
                        #(#declarations)*
                }

                #[doc = "Create a mock in the default context"]
                #vis fn new() -> Self {
                    Self(::understudy::Mock::new(Self::interface()))
                }

                #[doc = "Create a mock in `context`"]
                #vis fn with_context(context: &::understudy::Context) -> Self {
                    Self(::understudy::Mock::builder(Self::interface())
                        .context(context)
                        .build())
                }

                #[doc = "Configure the construction of a mock"]
                #vis fn builder() -> ::understudy::MockBuilder {
                    ::understudy::Mock::builder(Self::interface())
                }
            }

            impl ::core::default::Default for #mock_ident {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl ::core::ops::Deref for #mock_ident {
                type Target = ::understudy::Mock;

                fn deref(&self) -> &::understudy::Mock {
                    &self.0
                }
            }

            impl ::core::convert::From<::understudy::Mock> for #mock_ident {
                fn from(mock: ::understudy::Mock) -> Self {
                    Self(mock)
                }
            }

            #unsafety impl #ident for #mock_ident {
                #(#forwarders)*
            }
        )
    }
}

pub(crate) fn do_interface(attrs: TokenStream, input: TokenStream)
    -> TokenStream
{
    if !attrs.is_empty() {
        return Error::new(attrs.span(), "#[interface] takes no arguments")
            .to_compile_error();
    }
    let item: ItemTrait = match parse2(input) {
        Ok(t) => t,
        Err(e) => return e.to_compile_error()
    };
    let generated = match Interface::new(&item) {
        Ok(interface) => interface.gen(),
        Err(e) => e.to_compile_error()
    };
    quote!(
        #item
        #generated
    )
}
