use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use paperstock_core::MemberId;

use crate::app::errors;
use crate::context::ActorContext;

/// Header set by the upstream identity gateway.
pub const MEMBER_ID_HEADER: &str = "x-member-id";

pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let member_id = match extract_member_id(req.headers()) {
        Some(id) => id,
        None => {
            return errors::json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                vec![format!("missing or invalid {MEMBER_ID_HEADER} header")],
            );
        }
    };

    req.extensions_mut().insert(ActorContext::new(member_id));
    next.run(req).await
}

fn extract_member_id(headers: &HeaderMap) -> Option<MemberId> {
    headers
        .get(MEMBER_ID_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn member_id_must_be_positive() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_member_id(&headers), None);

        headers.insert(MEMBER_ID_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(extract_member_id(&headers), Some(MemberId::new(42)));

        headers.insert(MEMBER_ID_HEADER, HeaderValue::from_static("0"));
        assert_eq!(extract_member_id(&headers), None);

        headers.insert(MEMBER_ID_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(extract_member_id(&headers), None);
    }
}
