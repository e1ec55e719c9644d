//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, gateway calls, etc.) must be expressed as futures or asynchronous functions. Async handlers get
//! executed concurrently by worker threads and thus don't block execution.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use checkout_engine::{
    checkout_objects::{CheckoutRequest, ReconciliationOutcome},
    db_types::OrderId,
    traits::{CheckoutError, CheckoutGatewayDatabase, PaymentGateway},
    CheckoutApi,
};
use log::*;
use momo_gateway::{MpesaCallbackEnvelope, MtnCallback};
use spg_common::Money;

use crate::{
    config::ServerOptions,
    data_objects::{CheckoutOrderRequest, JsonResponse, PaymentStatusResponse},
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::payment_result_from,
};

// Actix-web cannot handle generics in handlers, so routes are registered manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl CheckoutGatewayDatabase, PaymentGateway);
/// Route handler for the checkout endpoint
///
/// Runs the full checkout sequence: cart validation, stock reservation, order creation and
/// payment initiation. On success the client receives `{order_id, correlation_id}` and should
/// follow up on `/payment_status` (or wait for the buyer-facing notification) while the provider
/// collects the payment.
///
/// Validation and stock failures are surfaced synchronously with a structured
/// `{success: false, message}` body; a failed initiation has already been compensated (no order,
/// no reservation) by the time the error reaches the client.
pub async fn checkout<BDb, GPay>(
    body: web::Json<CheckoutOrderRequest>,
    api: web::Data<CheckoutApi<BDb, GPay>>,
) -> Result<HttpResponse, ServerError>
where
    BDb: CheckoutGatewayDatabase,
    GPay: PaymentGateway,
{
    let body = body.into_inner();
    debug!("💻️ Checkout request from buyer {} with {} line(s)", body.buyer_id, body.items.len());
    let declared_total =
        Money::from_decimal(body.declared_total).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let request = CheckoutRequest {
        buyer_id: body.buyer_id,
        phone_number: body.phone_number,
        delivery_address: body.delivery_address,
        declared_total,
        lines: body.items,
    };
    let result = api.checkout(request).await.map_err(|e| {
        debug!("💻️ Checkout failed. {e}");
        e
    })?;
    info!("💻️ Checkout accepted. Order {} awaiting payment under {}", result.order_id, result.correlation_id);
    Ok(HttpResponse::Ok().json(result))
}

//------------------------------------------   Provider callbacks  ---------------------------------------------
route!(mpesa_callback => Post "/callback/mpesa" impl CheckoutGatewayDatabase, PaymentGateway);
/// Route handler for M-Pesa STK push result callbacks.
///
/// The provider retries undelivered callbacks, so this handler **always** answers 200 with an
/// acknowledgement body — including when the correlation id is unknown or the result is a
/// duplicate. Failing the delivery would only cause unbounded provider retries; the full payload
/// is logged for audit instead.
pub async fn mpesa_callback<BDb, GPay>(
    req: HttpRequest,
    options: web::Data<ServerOptions>,
    api: web::Data<CheckoutApi<BDb, GPay>>,
    body: web::Json<MpesaCallbackEnvelope>,
) -> HttpResponse
where
    BDb: CheckoutGatewayDatabase,
    GPay: PaymentGateway,
{
    let envelope = body.into_inner();
    let peer = get_remote_ip(&req, options.use_x_forwarded_for);
    info!("💻️ M-Pesa callback received from {peer:?}");
    info!("💻️ Payload: {}", serde_json::to_string(&envelope).unwrap_or_else(|e| format!("{e}")));
    let result = payment_result_from(envelope.into_update());
    acknowledge(api.apply_payment_result(result).await)
}

route!(mtn_callback => Post "/callback/mtn" impl CheckoutGatewayDatabase, PaymentGateway);
/// Route handler for MTN MoMo request-to-pay result callbacks.
///
/// Same contract as the M-Pesa callback route: validate the payload shape, translate it into the
/// normalized result, and always acknowledge with 200.
pub async fn mtn_callback<BDb, GPay>(
    req: HttpRequest,
    options: web::Data<ServerOptions>,
    api: web::Data<CheckoutApi<BDb, GPay>>,
    body: web::Json<MtnCallback>,
) -> HttpResponse
where
    BDb: CheckoutGatewayDatabase,
    GPay: PaymentGateway,
{
    let callback = body.into_inner();
    let peer = get_remote_ip(&req, options.use_x_forwarded_for);
    info!("💻️ MTN MoMo callback received from {peer:?}");
    info!("💻️ Payload: {}", serde_json::to_string(&callback).unwrap_or_else(|e| format!("{e}")));
    let update = match callback.into_update() {
        Ok(update) => update,
        Err(e) => {
            warn!("💻️ Could not interpret MTN callback: {e}. Acknowledging anyway");
            return HttpResponse::Ok().json(JsonResponse::failure("Could not interpret callback payload."));
        },
    };
    acknowledge(api.apply_payment_result(payment_result_from(update)).await)
}

/// Map a reconciliation outcome onto the acknowledgement the provider expects. Always 200.
fn acknowledge(outcome: Result<ReconciliationOutcome, CheckoutError>) -> HttpResponse {
    let body = match outcome {
        Ok(ReconciliationOutcome::Completed(order)) => {
            JsonResponse::success(format!("Order {} completed.", order.order_id))
        },
        Ok(ReconciliationOutcome::Failed(order)) => JsonResponse::success(format!("Order {} failed.", order.order_id)),
        Ok(ReconciliationOutcome::AlreadySettled(order)) => {
            info!("💻️ Duplicate result for settled order {}. No-op", order.order_id);
            JsonResponse::success("Result already applied.")
        },
        Ok(ReconciliationOutcome::Pending(_)) => JsonResponse::success("Result noted. Payment still pending."),
        Err(CheckoutError::CorrelationIdNotFound(reference)) => {
            warn!("💻️ Callback for unknown payment reference {reference}. Acknowledged without action");
            JsonResponse::success("No matching order. Acknowledged.")
        },
        Err(CheckoutError::StaleOrDuplicateCallback(reference)) => {
            info!("💻️ Stale or duplicate callback for {reference}. Acknowledged without action");
            JsonResponse::success("Stale or duplicate result. Acknowledged.")
        },
        Err(e) => {
            error!("💻️ Could not process payment result. {e}");
            JsonResponse::failure("Could not process payment result.")
        },
    };
    HttpResponse::Ok().json(body)
}

//----------------------------------------------   Status  ----------------------------------------------------
route!(payment_status => Get "/payment_status/{order_id}/{correlation_id}" impl CheckoutGatewayDatabase, PaymentGateway);
/// Route handler for client payment status queries.
///
/// The pull counterpart of the provider callback: if the order is still awaiting payment the
/// provider is polled, and the result flows through the same transition guard as a callback
/// would. The response reports `pending`, `completed` or `failed` with a reason on failure.
pub async fn payment_status<BDb, GPay>(
    path: web::Path<(OrderId, String)>,
    api: web::Data<CheckoutApi<BDb, GPay>>,
) -> Result<HttpResponse, ServerError>
where
    BDb: CheckoutGatewayDatabase,
    GPay: PaymentGateway,
{
    let (order_id, correlation_id) = path.into_inner();
    debug!("💻️ GET payment_status for {order_id}");
    let outcome = api.poll_and_reconcile(&order_id, &correlation_id).await.map_err(|e| {
        debug!("💻️ Could not resolve payment status. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(outcome)))
}
