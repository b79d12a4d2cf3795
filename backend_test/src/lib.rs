use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into synchronous ones and inject dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::model::store::Polls`, in any order, each at most once.
///
/// Two tests are generated. `<name>` runs against a fresh in-memory store.
/// `<name>_mongo` runs against a freshly named MongoDB database at
/// `MONGO_TEST_URI`, which is dropped regardless of how the test terminates;
/// it is ignored unless the `mongo-tests` feature is enabled.
#[proc_macro_attribute]
pub fn backend_test(_args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injection order and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the tests can have their original name.
    let name = item_fn.sig.ident.clone();
    let mongo_name = format_ident!("{}_mongo", name);
    let fut_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = fut_name.clone();

    let memory_setup = quote! {
        let polls: crate::model::store::Polls =
            std::sync::Arc::new(crate::model::store::MemoryStore::new());
        (polls, ())
    };
    let memory_cleanup = quote! {};

    let mongo_setup = quote! {
        let store = crate::model::store::MongoStore::connect(
            &crate::test_database_uri(),
            &crate::test_database_name(),
        )
        .await
        .unwrap();
        let db = store.database().clone();
        let polls: crate::model::store::Polls = std::sync::Arc::new(store);
        (polls, db)
    };
    let mongo_cleanup = quote! {
        handle.drop(None).await.unwrap();
    };

    let memory_body = harness(&fut_name, &test_args, memory_setup, memory_cleanup);
    let mongo_body = harness(&fut_name, &test_args, mongo_setup, mongo_cleanup);

    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            #memory_body
        }

        #[test]
        #[cfg_attr(not(feature = "mongo-tests"), ignore)]
        fn #mongo_name() {
            /// The test itself.
            #item_fn

            #mongo_body
        }
    }
    .into()
}

/// Generate the body of one test: set up a store and a client, run the test
/// future catching any panics, clean up, and re-raise.
///
/// `setup` must evaluate to `(Polls, handle)`; `cleanup` may use `handle`.
fn harness(
    fut_name: &Ident,
    test_args: &[TokenStream2],
    setup: TokenStream2,
    cleanup: TokenStream2,
) -> TokenStream2 {
    quote! {
        crate::init_test_logging();

        // Create an async runtime. We need a separate one for inside and
        // outside the `catch_unwind`.
        let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
            .thread_name("test-setup-cleanup")
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
            .thread_name("rocket-worker-test-thread")
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();

        // Run the setup.
        let (rocket_client, polls, handle) = outer_runtime.block_on(async {
            let (polls, handle) = { #setup };
            let rocket_client = rocket::local::asynchronous::Client::tracked(
                crate::rocket_for_store(polls.clone()),
            )
            .await
            .unwrap();
            (rocket_client, polls, handle)
        });

        // Run the test, catching any panics.
        // Use mutexes to safely transfer `!UnwindSafe` data.
        let client_mutex = std::sync::Mutex::new(rocket_client);
        let polls_mutex = std::sync::Mutex::new(polls);
        let runtime_mutex = std::sync::Mutex::new(inner_runtime);
        let result = std::panic::catch_unwind(|| {
            let rocket_client = client_mutex.into_inner().unwrap();
            let polls = polls_mutex.into_inner().unwrap();
            let runtime = runtime_mutex.into_inner().unwrap();
            // Only some tests take each dependency.
            let _ = (&rocket_client, &polls);

            runtime.block_on(#fut_name(#(#test_args),*));
        });

        // Run the cleanup.
        outer_runtime.block_on(async move {
            #[allow(unused_variables)]
            let handle = handle;
            #cleanup
        });

        // If the test panicked, re-raise the panic.
        if let Err(cause) = result {
            std::panic::resume_unwind(cause);
        }
    }
}

/// Ensure the wrapped test is async, and work out which dependencies to pass in which order.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_polls = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Valid as the last path segment for any type is itself.
                    let type_ident = &type_path.path.segments.last().unwrap().ident;
                    if type_ident == "Client" {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    } else if type_ident == "Polls" {
                        if has_polls {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `Polls`",
                            ));
                        }
                        has_polls = true;
                        args.push(quote! { polls });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `polls_ident: Polls`",
        ));
    }

    Ok(args)
}
