use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, Result, Token, parse::Parse, parse::ParseStream};

/// 单个方法上的 `#[subscribe(...)]` 参数
#[derive(Default)]
pub(crate) struct SubscribeAttrConfig {
    pub(crate) priority: Option<Expr>,
}

impl Parse for SubscribeAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self::default();
        if input.is_empty() {
            return Ok(cfg);
        }

        let pairs: Punctuated<syn::ExprAssign, Token![,]> =
            Punctuated::<syn::ExprAssign, Token![,]>::parse_terminated(input)?;

        for assign in pairs.into_iter() {
            let key_ident = match *assign.left {
                Expr::Path(p) if p.path.segments.len() == 1 => p.path.segments[0].ident.clone(),
                other => {
                    return Err(syn::Error::new(other.span(), "invalid attribute key"));
                }
            };
            match key_ident.to_string().as_str() {
                "priority" => {
                    if cfg.priority.is_some() {
                        return Err(syn::Error::new(
                            key_ident.span(),
                            "duplicate key 'priority' in attribute",
                        ));
                    }
                    cfg.priority = Some(*assign.right);
                }
                _ => {
                    return Err(syn::Error::new(
                        key_ident.span(),
                        "unknown key in attribute; expected 'priority'",
                    ));
                }
            }
        }

        Ok(cfg)
    }
}

/// 取出并移除方法上的 `#[subscribe]`；无标记返回 `None`
pub(crate) fn take_subscribe(attrs: &mut Vec<Attribute>) -> Result<Option<SubscribeAttrConfig>> {
    let mut found: Option<SubscribeAttrConfig> = None;
    let mut retained = Vec::with_capacity(attrs.len());

    for attr in attrs.drain(..) {
        if !is_subscribe(attr.path()) {
            retained.push(attr);
            continue;
        }
        if found.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "duplicate #[subscribe] on the same method",
            ));
        }
        let cfg = match &attr.meta {
            syn::Meta::Path(_) => SubscribeAttrConfig::default(),
            syn::Meta::List(list) => syn::parse2(list.tokens.clone())?,
            syn::Meta::NameValue(nv) => {
                return Err(syn::Error::new(
                    nv.span(),
                    format!(
                        "expected #[subscribe] or #[subscribe(priority = ..)], found `{}`",
                        nv.to_token_stream()
                    ),
                ));
            }
        };
        found = Some(cfg);
    }

    *attrs = retained;
    Ok(found)
}

// 同时识别 `#[subscribe]` 与 `#[sebus_macros::subscribe]`
fn is_subscribe(path: &syn::Path) -> bool {
    path.segments
        .last()
        .is_some_and(|segment| segment.ident == "subscribe")
}
