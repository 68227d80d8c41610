//! Subscription verification over `fetch`.
//!
//! One POST to the verification endpoint, aborted by an `AbortController`
//! after the timeout. The reply is handed to
//! [`scheme_core::verify::interpret_response`].

use scheme_core::verify::{
    FocusField, Session, VERIFY_ENDPOINT, VERIFY_TIMEOUT_MS, VerifyError, VerifyRequest,
    interpret_response,
};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Headers, Request, RequestInit, Response};

/// Send the request and wait for the service's verdict.
pub async fn check_subscription(request: &VerifyRequest) -> Result<Session, VerifyError> {
    let window = web_sys::window().ok_or(VerifyError::Unsupported)?;
    let controller = AbortController::new().map_err(|_| VerifyError::Unsupported)?;

    let timed_out = Rc::new(Cell::new(false));
    let abort = {
        let controller = controller.clone();
        let timed_out = Rc::clone(&timed_out);
        Closure::once_into_js(move || {
            timed_out.set(true);
            controller.abort();
        })
    };
    let timer = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            abort.unchecked_ref(),
            VERIFY_TIMEOUT_MS as i32,
        )
        .map_err(|_| VerifyError::Unsupported)?;

    let result = send(&window, request, &controller, &timed_out).await;
    window.clear_timeout_with_handle(timer);

    match &result {
        Ok(_) => log::debug!("verification succeeded"),
        Err(e) => log::debug!("verification failed: {e}"),
    }
    result
}

async fn send(
    window: &web_sys::Window,
    request: &VerifyRequest,
    controller: &AbortController,
    timed_out: &Cell<bool>,
) -> Result<Session, VerifyError> {
    let headers = Headers::new().map_err(|_| VerifyError::Unsupported)?;
    headers
        .set("Content-Type", "application/json")
        .map_err(|_| VerifyError::Unsupported)?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&request.to_json()));
    init.set_signal(Some(&controller.signal()));

    let req = Request::new_with_str_and_init(VERIFY_ENDPOINT, &init)
        .map_err(|e| network_error(&e, timed_out))?;
    let reply = JsFuture::from(window.fetch_with_request(&req))
        .await
        .map_err(|e| network_error(&e, timed_out))?;
    let response: Response = reply
        .dyn_into()
        .map_err(|_| VerifyError::Network("fetch returned a non-Response".to_string()))?;

    let status = response.status();
    let text_promise = response.text().map_err(|e| network_error(&e, timed_out))?;
    let body = JsFuture::from(text_promise)
        .await
        .map_err(|e| network_error(&e, timed_out))?
        .as_string()
        .unwrap_or_default();

    interpret_response(status, &body)
}

fn network_error(err: &JsValue, timed_out: &Cell<bool>) -> VerifyError {
    if timed_out.get() {
        return VerifyError::Timeout;
    }
    let message = err
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| "request failed".to_string());
    VerifyError::Network(message)
}

/// JSON reply for the host: `{"ok":true,"token":..}` or
/// `{"ok":false,"error":..,"reason":..,"focus":"username"|"code"}`.
pub fn outcome_json(result: &Result<Session, VerifyError>) -> String {
    let value = match result {
        Ok(session) => serde_json::json!({
            "ok": true,
            "token": session.access_token,
        }),
        Err(err) => {
            let reason = match err {
                VerifyError::Timeout => "timeout",
                VerifyError::Network(_) => "network_error",
                VerifyError::Rejected { reason, .. } => reason.as_str(),
                VerifyError::Unsupported => "unsupported",
            };
            let focus = match err.focus_field() {
                FocusField::Username => "username",
                FocusField::Code => "code",
            };
            serde_json::json!({
                "ok": false,
                "error": err.to_string(),
                "reason": reason,
                "focus": focus,
            })
        }
    };
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheme_core::verify::VerifyReason;

    #[test]
    fn outcome_json_shapes() {
        let ok = outcome_json(&Ok(Session {
            access_token: Some("tok".into()),
        }));
        assert_eq!(ok, r#"{"ok":true,"token":"tok"}"#);

        let rejected = outcome_json(&Err(VerifyError::Rejected {
            message: "bad code".into(),
            reason: VerifyReason::InvalidCode,
        }));
        let v: serde_json::Value = serde_json::from_str(&rejected).unwrap();
        assert_eq!(v["focus"], "code");
        assert_eq!(v["reason"], "invalid_code");
        assert_eq!(v["error"], "bad code");

        let timeout: serde_json::Value =
            serde_json::from_str(&outcome_json(&Err(VerifyError::Timeout))).unwrap();
        assert_eq!(timeout["reason"], "timeout");
        assert_eq!(timeout["focus"], "username");
    }
}
