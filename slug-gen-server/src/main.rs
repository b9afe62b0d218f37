use std::env;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use anyhow::Context;
use log::{info, warn};
use serde::Deserialize;

use slug_gen_core::{GenerateError, Generator, Root, load_config};

/// Environment variable holding the configuration path.
const CONFIG_ENV: &str = "SLUG_GEN_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./data";

/// Upper bound of `count` for a single request.
const MAX_COUNT: usize = 1000;

/// Query parameters of the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	root: Option<String>,
	count: Option<usize>,
	join: Option<bool>,
}

/// Query parameters of the `/v1/count` endpoint
#[derive(Deserialize)]
struct RootQuery {
	root: Option<String>,
}

fn parse_root(root: Option<&str>) -> Root {
	root.map(Root::parse).unwrap_or_default()
}

fn error_response(e: GenerateError) -> HttpResponse {
	match e {
		GenerateError::UnknownRoot(_) => HttpResponse::NotFound().body(e.to_string()),
		GenerateError::Config(_) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates `count` slugs (default 1) from `root` (default root if absent).
/// With `join=false` the response is a JSON array of word arrays, otherwise
/// one slug per line.
///
/// Generation runs on the blocking thread pool: the rejection loop of a
/// badly constrained root may take arbitrarily long.
#[get("/v1/generate")]
async fn get_generated(generator: web::Data<Generator>, query: web::Query<GenerateParams>) -> impl Responder {
	let root = parse_root(query.root.as_deref());
	let count = query.count.unwrap_or(1);
	if count == 0 || count > MAX_COUNT {
		return HttpResponse::BadRequest().body(format!("count must be between 1 and {MAX_COUNT}"));
	}

	if query.join.unwrap_or(true) {
		let slugs = web::block(move || (0..count).map(|_| generator.generate_slug(&root)).collect::<Result<Vec<_>, _>>());
		match slugs.await {
			Ok(Ok(slugs)) => HttpResponse::Ok().body(slugs.join("\n")),
			Ok(Err(e)) => error_response(e),
			Err(_) => HttpResponse::InternalServerError().body("Generation was interrupted"),
		}
	} else {
		let words = web::block(move || (0..count).map(|_| generator.generate(&root)).collect::<Result<Vec<_>, _>>());
		match words.await {
			Ok(Ok(words)) => HttpResponse::Ok().json(words),
			Ok(Err(e)) => error_response(e),
			Err(_) => HttpResponse::InternalServerError().body("Generation was interrupted"),
		}
	}
}

/// HTTP GET endpoint `/v1/count`: number of combinations of a root.
#[get("/v1/count")]
async fn get_count(generator: web::Data<Generator>, query: web::Query<RootQuery>) -> impl Responder {
	match generator.combination_count(&parse_root(query.root.as_deref())) {
		Ok(count) => HttpResponse::Ok().body(count.to_string()),
		Err(e) => error_response(e),
	}
}

#[get("/v1/roots")]
async fn get_roots(generator: web::Data<Generator>) -> impl Responder {
	HttpResponse::Ok().body(generator.root_names().join("\n"))
}

fn configure(cfg: &mut web::ServiceConfig) {
	cfg.service(get_generated).service(get_count).service(get_roots);
}

/// Main entry point for the server.
///
/// Loads the configuration once, builds the generator and shares it between
/// workers. The generator is `Sync`, so no outer lock is needed.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - The configuration path is read from `SLUG_GEN_CONFIG` (default `./data`).
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let path = env::var(CONFIG_ENV).unwrap_or_else(|_| {
		warn!("{CONFIG_ENV} is not set, using {DEFAULT_CONFIG_PATH}");
		DEFAULT_CONFIG_PATH.to_owned()
	});
	let config = load_config(&path).with_context(|| format!("Failed to load configuration from {path}"))?;
	let generator = Generator::new(config).context("Failed to build the generator")?;
	info!("Serving {} combinations from {path}", generator.combination_count(&Root::Default)?);

	let generator = web::Data::new(generator);
	HttpServer::new(move || App::new().wrap(Cors::permissive()).app_data(generator.clone()).configure(configure))
		.bind(("127.0.0.1", 5000))?
		.run()
		.await?;
	Ok(())
}
