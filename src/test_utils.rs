#[cfg(test)]
pub mod fixtures {
    use actix_web::cookie::Cookie;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
    use secrecy::SecretString;
    use serde_json::Value;

    use crate::{
        auth::{SecretKind, TokenSet, TokenStore},
        models::domain::{ExamDetail, Question},
    };

    const SIGNING_KEY_PEM: &str = include_str!("../tests/fixtures/idp_signing_key.pem");
    const PUBLIC_KEY_PEM: &str = include_str!("../tests/fixtures/idp_public_key.pem");

    /// Exam with questions `q1..qN`, each offering choices A to D.
    pub fn sample_exam(exam_id: &str, question_count: usize, duration_minutes: u64) -> ExamDetail {
        let questions = (1..=question_count)
            .map(|n| Question {
                question_id: format!("q{}", n),
                text: format!("Question {}", n),
                choices: ["A", "B", "C", "D"].iter().map(|c| c.to_string()).collect(),
                points: 1.0,
            })
            .collect();

        ExamDetail {
            exam_id: exam_id.to_string(),
            exam_name: format!("Sample exam {}", exam_id),
            duration_minutes,
            questions,
        }
    }

    /// Id token with a throwaway HS256 signature; only good for unverified mode.
    pub fn unsigned_id_token(claims: Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"not-the-provider"),
        )
        .expect("test token should encode")
    }

    /// Id token signed with the fixture provider key.
    pub fn signed_id_token(claims: Value) -> String {
        let key = EncodingKey::from_rsa_pem(SIGNING_KEY_PEM.as_bytes())
            .expect("fixture signing key should parse");
        encode(&Header::new(Algorithm::RS256), &claims, &key).expect("test token should encode")
    }

    pub fn test_public_key() -> DecodingKey {
        DecodingKey::from_rsa_pem(PUBLIC_KEY_PEM.as_bytes()).expect("fixture public key should parse")
    }

    /// Store holding `id_token` as a live credential for the next hour.
    pub fn store_with_id_token(id_token: &str) -> TokenStore {
        let store = TokenStore::new();
        store.replace(
            TokenSet {
                id_token: SecretString::from(id_token.to_string()),
                access_token: SecretString::from("access".to_string()),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
            },
            Duration::days(1),
        );
        store
    }

    pub fn id_token_cookie(id_token: &str) -> Cookie<'static> {
        Cookie::new(SecretKind::IdToken.cookie_name(), id_token.to_string())
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::{http::StatusCode, web, App, HttpServer};

    /// Starts a throwaway HTTP server on a free local port and returns its
    /// base URL. Must be called from inside an actix system.
    pub fn spawn_stub_server<F>(routes: F) -> String
    where
        F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
    {
        let server = HttpServer::new(move || App::new().configure(routes.clone()))
            .workers(1)
            .disable_signals()
            .bind(("127.0.0.1", 0))
            .expect("stub server should bind");

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{}", addr)
    }

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use crate::auth::SecretKind;
    use serde_json::json;

    #[test]
    fn test_sample_exam_shape() {
        let exam = sample_exam("e1", 3, 1);
        assert_eq!(exam.allowed_duration_seconds(), 60);
        let ids: Vec<_> = exam.questions.iter().map(|q| q.question_id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2", "q3"]);
        assert!(exam.questions.iter().all(|q| q.offers("D")));
    }

    #[test]
    fn test_store_with_id_token_is_live() {
        let store = store_with_id_token(&unsigned_id_token(json!({ "sub": "u1" })));
        assert!(store.contains(SecretKind::IdToken));
        assert!(!store.contains(SecretKind::RefreshToken));
    }
}
