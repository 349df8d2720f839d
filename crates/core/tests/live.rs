//! Tests against a real R installation and the public OpenCPU server.
//!
//! Run with `cargo test -p ocpu-rs --test live -- --ignored`.

use std::time::Duration;

use ocpu::{Format, LocalConfig, Params, RemoteConfig, Session};

const FORM: &str = "application/x-www-form-urlencoded";
const COEF: &str = "[8.2839056418, 0.16556757464]\n";

fn coef_query() -> String {
	url::form_urlencoded::Serializer::new(String::new())
		.append_pair("x", "coef(lm(speed ~ dist, data = cars))")
		.finish()
}

async fn check_identity(session: &Session) {
	let manifest = session
		.call("library/base/R/identity", FORM, &Params::new(), coef_query())
		.await
		.unwrap();
	let digits = Params::from([("digits".to_string(), "10".to_string())]);
	let got = session
		.value(&manifest, Some(Format::Json), &digits)
		.await
		.unwrap()
		.text()
		.await
		.unwrap();
	assert_eq!(got, COEF);
}

async fn check_rnorm(session: &Session) {
	let draws: Vec<f64> = session
		.post_json(
			"library/stats/R/rnorm/json",
			&Params::new(),
			&serde_json::json!({"n": 10, "mean": 10, "sd": 10}),
		)
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(draws.len(), 10);
}

#[tokio::test]
#[ignore = "needs R with the opencpu package"]
async fn local_identity() {
	let mut config = LocalConfig::new(3000);
	config.timeout = Duration::from_secs(10);
	let session = Session::local(config).await.unwrap();
	check_identity(&session).await;
	check_rnorm(&session).await;
	session.close().await.unwrap();
}

#[tokio::test]
#[ignore = "needs network access to public.opencpu.org"]
async fn remote_identity() {
	let session = Session::remote(RemoteConfig::new("http://public.opencpu.org"))
		.await
		.unwrap();
	check_identity(&session).await;
	check_rnorm(&session).await;
	session.close().await.unwrap();
}
