use crate::subscribe_attr::{SubscribeAttrConfig, take_subscribe};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{FnArg, ImplItem, ImplItemFn, Item, ItemImpl, LitStr, Type, parse_macro_input};

/// #[subscriber] 宏实现
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::TokenStream::from(attr).span(),
            "#[subscriber] takes no arguments",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as Item);
    let mut item_impl = match input {
        Item::Impl(im) => im,
        other => {
            return syn::Error::new(
                other.span(),
                "#[subscriber] only supports inherent impl blocks",
            )
            .to_compile_error()
            .into();
        }
    };

    if let Some((_, path, _)) = &item_impl.trait_ {
        return syn::Error::new(
            path.span(),
            "#[subscriber] only supports inherent impl blocks, found a trait impl",
        )
        .to_compile_error()
        .into();
    }

    match expand_impl(&mut item_impl) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_impl(item_impl: &mut ItemImpl) -> syn::Result<TokenStream2> {
    let mut entries = Vec::new();

    for item in item_impl.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        // 先移除标记，输出的 impl 块中不再保留 #[subscribe]
        let marker = take_subscribe(&mut method.attrs)?;
        if let Some(entry) = method_entry(method, marker)? {
            entries.push(entry);
        }
    }

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    Ok(quote! {
        #item_impl

        impl #impl_generics ::sebus::subscriber::Subscriber for #self_ty #where_clause {
            fn handlers() -> ::std::vec::Vec<::sebus::subscriber::HandlerMethod<Self>> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}

/// 事件参数的传递方式
enum EventParam {
    Borrowed(Type),
    BorrowedMut(Type),
    Owned(Type),
}

impl EventParam {
    fn of(ty: &Type) -> Self {
        match ty {
            Type::Reference(r) if r.mutability.is_some() => Self::BorrowedMut((*r.elem).clone()),
            Type::Reference(r) => Self::Borrowed((*r.elem).clone()),
            other => Self::Owned(other.clone()),
        }
    }

    fn event_type(&self) -> &Type {
        match self {
            Self::Borrowed(ty) | Self::BorrowedMut(ty) | Self::Owned(ty) => ty,
        }
    }
}

/// 接收者必须为 `&self`
fn receiver_problem(method: &ImplItemFn) -> Option<&'static str> {
    let Some(receiver) = method.sig.receiver() else {
        return Some("handler has no receiver; expected &self");
    };
    match &*receiver.ty {
        Type::Reference(r) if r.mutability.is_some() => {
            Some("handler takes &mut self; expected &self")
        }
        Type::Reference(r) if matches!(&*r.elem, Type::Path(p) if p.path.is_ident("Self")) => None,
        _ => Some("handler takes self by value or a custom receiver; expected &self"),
    }
}

fn method_entry(
    method: &ImplItemFn,
    marker: Option<SubscribeAttrConfig>,
) -> syn::Result<Option<TokenStream2>> {
    let ident = &method.sig.ident;
    let name = LitStr::new(&ident.unraw().to_string(), ident.span());
    let params: Vec<&Type> = method
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pt) => Some(&*pt.ty),
            FnArg::Receiver(_) => None,
        })
        .collect();
    let arity = params.len();

    let Some(cfg) = marker else {
        // 无标记的关联函数不属于实例方法，不进入方法表
        if method.sig.receiver().is_none() {
            return Ok(None);
        }
        return Ok(Some(quote! {
            ::sebus::subscriber::HandlerMethod::plain(#name, #arity)
        }));
    };

    let priority = match cfg.priority {
        Some(expr) => quote! { #expr },
        None => quote! { ::sebus::subscriber::DEFAULT_PRIORITY },
    };

    if arity != 1 {
        return Ok(Some(quote! {
            ::sebus::subscriber::HandlerMethod::marked(#name, #priority, #arity)
        }));
    }

    if let Some(param) = method.sig.generics.params.first() {
        return Err(syn::Error::new(
            param.span(),
            "#[subscribe] handlers cannot be generic",
        ));
    }

    let param = EventParam::of(params[0]);
    let event_ty = param.event_type();

    let problem = receiver_problem(method)
        .or_else(|| method.sig.asyncness.map(|_| "async handlers are not supported"))
        .or_else(|| {
            matches!(param, EventParam::BorrowedMut(_))
                .then_some("handler takes &mut event; events are shared and must be taken by & or by value")
        });

    if let Some(reason) = problem {
        return Ok(Some(quote! {
            ::sebus::subscriber::HandlerMethod::unbindable::<#event_ty>(#name, #priority, #reason)
        }));
    }

    let arg = match param {
        EventParam::Owned(_) => quote! { ::std::clone::Clone::clone(event) },
        _ => quote! { event },
    };

    Ok(Some(quote! {
        ::sebus::subscriber::HandlerMethod::bound::<#event_ty>(
            #name,
            #priority,
            |owner: &Self, event: &#event_ty| {
                ::sebus::subscriber::IntoHandlerResult::into_handler_result(owner.#ident(#arg))
            },
        )
    }))
}
