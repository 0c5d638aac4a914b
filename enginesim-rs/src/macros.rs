/// Turns an `async fn` into a plain `fn` returning a boxed future, so test
/// bodies can be stored as `AsyncTestFunc` pointers inside a `TestSpec`.
#[macro_export]
macro_rules! dyn_async {(
    $( #[$attr:meta] )*
    $pub:vis
    async fn $fname:ident<$lt:lifetime> ( $($args:tt)* ) $(-> $ret:ty)? { $($body:tt)* }
) => (
    $( #[$attr] )*
    #[allow(unused_parens)]
    $pub fn $fname<$lt> ( $($args)* ) -> ::std::pin::Pin<::std::boxed::Box<
        dyn ::std::future::Future<Output = ($($ret)?)>
            + ::std::marker::Send
            + $lt,
    >> {
        ::std::boxed::Box::pin(async move { $($body)* })
    }
)}
