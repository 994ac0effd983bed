use proc_macro::TokenStream;

mod subscribe_attr;
mod subscriber;

/// 订阅者宏
/// - 用于订阅者类型的固有 `impl` 块
/// - 为该类型实现 `::sebus::subscriber::Subscriber`，方法表包含块内全部实例方法
/// - 以 `#[subscribe]` / `#[subscribe(priority = N)]` 标记处理器，默认优先级为 1
/// - 合格处理器：带标记且恰好一个参数；参数为 `&E` 时直接借用，为 `E` 时要求 `E: Clone`
/// - `&mut self`、`self`、无接收者、`&mut E` 参数与 `async fn` 的处理器在注册时被跳过并报告
#[proc_macro_attribute]
pub fn subscriber(attr: TokenStream, item: TokenStream) -> TokenStream {
    subscriber::expand(attr, item)
}

/// 处理器标记，只能出现在 `#[subscriber]` 修饰的 `impl` 块内，由其统一解析并移除
#[proc_macro_attribute]
pub fn subscribe(attr: TokenStream, item: TokenStream) -> TokenStream {
    let _ = attr;
    let span = syn::parse::<syn::ItemFn>(item.clone())
        .map(|f| f.sig.ident.span())
        .unwrap_or_else(|_| proc_macro2::Span::call_site());
    let item = proc_macro2::TokenStream::from(item);
    let err = syn::Error::new(
        span,
        "#[subscribe] must be used on a method inside an impl block annotated with #[subscriber]",
    )
    .to_compile_error();
    TokenStream::from(quote::quote! { #err #item })
}
