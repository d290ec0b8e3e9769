//! Mensura conversion server
//!
//! Line-delimited JSON over stdio: one request per stdin line, one
//! response per stdout line. Logs go to stderr.
//!
//! Methods:
//! - convert: one amount between two units
//! - convert_list: amounts between plain or mixed units
//! - convertible: whether two units convert, and their bases
//! - describe: normalized form, base, quantity and factor of a unit
//! - catalog: quantities, units and prefixes
//!
//! Environment:
//! - MENSURA_CATALOG: path to a TSV catalog (built-in when unset)
//! - MENSURA_CACHE_SIZE: unit cache capacity (default 1000)
//! - MENSURA_LOG: log level (default info)

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use mensura_core::{ErrorReport, Rational, UnitError, DECIMAL_DIGITS};
use mensura_units::{
    Catalog, Converter, FactoryConfig, DEFAULT_CACHE_CAPACITY, BINARY_PREFIXES, SI_PREFIXES,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const SERVER_NAME: &str = "mensura";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol-level error codes, next to the library's unit error codes
mod protocol_codes {
    pub const INVALID_JSON: &str = "INVALID_JSON";
    pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
    pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
}

// ============ Configuration ============

/// Catalog path from environment
fn catalog_path() -> Option<PathBuf> {
    env::var("MENSURA_CATALOG").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

fn cache_size() -> usize {
    match env::var("MENSURA_CACHE_SIZE") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(value = raw.as_str(), "MENSURA_CACHE_SIZE is not a number, using default");
            DEFAULT_CACHE_CAPACITY
        }),
        Err(_) => DEFAULT_CACHE_CAPACITY,
    }
}

fn log_level() -> Level {
    env::var("MENSURA_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO)
}

fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level())
        .with_writer(io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("mensura: logging already initialized");
    }
}

fn load_catalog() -> Result<Catalog, String> {
    match catalog_path() {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
            Catalog::from_tsv(&text).map_err(|e| format!("{}: {}", path.display(), e))
        }
        None => Catalog::builtin().map_err(|e| e.to_string()),
    }
}

// ============ Protocol types ============

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

impl Response {
    fn from_result(id: Option<JsonValue>, result: Result<JsonValue, ErrorReport>) -> Self {
        match result {
            Ok(r) => Self { id, result: Some(r), error: None },
            Err(e) => Self { id, result: None, error: Some(e) },
        }
    }
}

fn protocol_error(code: &str, message: String) -> ErrorReport {
    ErrorReport { code: code.to_string(), message, identifier: String::new(), suggestion: None }
}

fn unit_error(e: UnitError) -> ErrorReport {
    e.report()
}

/// How results are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Numeric {
    Rational,
    #[default]
    Decimal,
    Double,
}

#[derive(Debug, Deserialize)]
struct ConvertParams {
    amount: JsonValue,
    from: String,
    to: String,
    #[serde(default)]
    numeric: Numeric,
}

#[derive(Debug, Deserialize)]
struct ConvertListParams {
    amounts: Vec<JsonValue>,
    from: String,
    to: String,
    #[serde(default)]
    numeric: Numeric,
}

#[derive(Debug, Deserialize)]
struct PairParams {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct DescribeParams {
    unit: String,
}

fn params<T: for<'de> Deserialize<'de>>(params: &Option<JsonValue>) -> Result<T, ErrorReport> {
    let value = params.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(value)
        .map_err(|e| protocol_error(protocol_codes::INVALID_PARAMS, format!("Invalid params: {}", e)))
}

/// Amounts arrive as strings ("1.27", "1/3") or JSON numbers
fn parse_amount(value: &JsonValue) -> Result<Rational, ErrorReport> {
    let text = match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        other => {
            return Err(protocol_error(
                protocol_codes::INVALID_PARAMS,
                format!("Amount must be a string or number, got {}", other),
            ))
        }
    };
    Rational::from_str(&text).map_err(|e| protocol_error(protocol_codes::INVALID_PARAMS, e.to_string()))
}

fn render(value: &Rational, numeric: Numeric) -> String {
    match numeric {
        Numeric::Rational => value.to_string(),
        Numeric::Decimal => value.to_decimal_string(DECIMAL_DIGITS),
        Numeric::Double => format!("{}", value.to_f64()),
    }
}

// ============ Server ============

struct Server {
    converter: Converter,
}

impl Server {
    fn handle(&self, request: &Request) -> Response {
        let result = match request.method.as_str() {
            "convert" => self.convert(&request.params),
            "convert_list" => self.convert_list(&request.params),
            "convertible" => self.convertible(&request.params),
            "describe" => self.describe(&request.params),
            "catalog" => Ok(self.catalog()),
            "version" => Ok(json!({ "name": SERVER_NAME, "version": SERVER_VERSION })),
            _ => Err(protocol_error(
                protocol_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };
        Response::from_result(request.id.clone(), result)
    }

    fn convert(&self, raw: &Option<JsonValue>) -> Result<JsonValue, ErrorReport> {
        let p: ConvertParams = params(raw)?;
        let amount = parse_amount(&p.amount)?;
        let value = match p.numeric {
            Numeric::Double => {
                let result = self.converter.convert(amount.to_f64(), &p.from, &p.to).map_err(unit_error)?;
                format!("{}", result)
            }
            numeric => {
                let result = self.converter.convert(amount, &p.from, &p.to).map_err(unit_error)?;
                render(&result, numeric)
            }
        };
        Ok(json!({ "value": value, "from": p.from, "to": p.to }))
    }

    fn convert_list(&self, raw: &Option<JsonValue>) -> Result<JsonValue, ErrorReport> {
        let p: ConvertListParams = params(raw)?;
        let amounts = p.amounts.iter().map(parse_amount).collect::<Result<Vec<_>, _>>()?;
        let values: Vec<String> = match p.numeric {
            Numeric::Double => {
                let doubles: Vec<f64> = amounts.iter().map(Rational::to_f64).collect();
                self.converter
                    .convert_list(&doubles, &p.from, &p.to)
                    .map_err(unit_error)?
                    .iter()
                    .map(|v| format!("{}", v))
                    .collect()
            }
            numeric => self
                .converter
                .convert_list(&amounts, &p.from, &p.to)
                .map_err(unit_error)?
                .iter()
                .map(|v| render(v, numeric))
                .collect(),
        };
        Ok(json!({ "values": values, "from": p.from, "to": p.to }))
    }

    fn convertible(&self, raw: &Option<JsonValue>) -> Result<JsonValue, ErrorReport> {
        let p: PairParams = params(raw)?;
        let convertible = self.converter.is_convertible(&p.from, &p.to).map_err(unit_error)?;
        let from_base = self.converter.base_identifier(&p.from).map_err(unit_error)?;
        let to_base = self.converter.base_identifier(&p.to).map_err(unit_error)?;
        Ok(json!({ "convertible": convertible, "from_base": from_base, "to_base": to_base }))
    }

    fn describe(&self, raw: &Option<JsonValue>) -> Result<JsonValue, ErrorReport> {
        let p: DescribeParams = params(raw)?;
        let factory = self.converter.factory();
        let unit = factory.from(&p.unit).map_err(unit_error)?;
        serde_json::to_value(unit.describe(factory.catalog()))
            .map_err(|e| protocol_error(protocol_codes::INVALID_PARAMS, e.to_string()))
    }

    fn catalog(&self) -> JsonValue {
        let catalog = self.converter.factory().catalog();
        let prefixes: Vec<&str> = SI_PREFIXES.iter().chain(BINARY_PREFIXES.iter()).map(|p| p.name).collect();
        json!({
            "quantities": catalog.quantities(),
            "base_units": catalog.base_units(),
            "units": catalog.entries(),
            "prefixes": prefixes,
        })
    }
}

fn write_response(response: &Response) -> io::Result<()> {
    let line = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()
}

fn main() {
    init_logging();

    let catalog = match load_catalog() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let size = cache_size();
    let config = FactoryConfig { cache_capacity: size, resolver_capacity: size };
    let server = Server { converter: Converter::with_catalog(catalog, config) };

    info!(
        version = SERVER_VERSION,
        catalog = %catalog_path().map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
        cache_size = size,
        "server ready"
    );

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                debug!("stdin closed");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let response = match serde_json::from_str::<Request>(line) {
                    Ok(request) => {
                        debug!(method = request.method.as_str(), "request");
                        server.handle(&request)
                    }
                    Err(e) => {
                        warn!(error = %e, "unparseable request");
                        Response::from_result(
                            None,
                            Err(protocol_error(protocol_codes::INVALID_JSON, format!("Parse error: {}", e))),
                        )
                    }
                };

                if let Err(e) = write_response(&response) {
                    error!(error = %e, "failed to write response");
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "failed to read input");
                break;
            }
        }
    }

    info!("server shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Server {
        Server { converter: Converter::builtin().unwrap() }
    }

    fn call(method: &str, params: JsonValue) -> Response {
        let request = Request { id: Some(json!(1)), method: method.to_string(), params: Some(params) };
        server().handle(&request)
    }

    #[test]
    fn test_convert_decimal_by_default() {
        let response = call("convert", json!({ "amount": "3", "from": "foot-per-second", "to": "kilometer-per-hour" }));
        assert_eq!(response.result.unwrap()["value"], "3.29184");
    }

    #[test]
    fn test_numeric_modes() {
        let response = call("convert", json!({ "amount": 1, "from": "foot", "to": "yard", "numeric": "rational" }));
        assert_eq!(response.result.unwrap()["value"], "1/3");
        let response = call("convert", json!({ "amount": "100", "from": "celsius", "to": "kelvin" }));
        assert_eq!(response.result.unwrap()["value"], "373.15");
        let response = call("convert", json!({ "amount": "0.5", "from": "kilometer", "to": "meter", "numeric": "double" }));
        assert_eq!(response.result.unwrap()["value"], "500");
    }

    #[test]
    fn test_convert_list() {
        let response = call("convert_list", json!({ "amounts": ["1.27"], "from": "meter", "to": "foot-and-inch" }));
        assert_eq!(response.result.unwrap()["values"], json!(["4", "2"]));
    }

    #[test]
    fn test_unit_error_report() {
        let response = call("convert", json!({ "amount": "1", "from": "foobar", "to": "kilogram" }));
        let error = response.error.unwrap();
        assert_eq!(error.code, "UNKNOWN_UNIT");
        assert_eq!(error.identifier, "foobar");
        assert!(response.result.is_none());
    }

    #[test]
    fn test_protocol_errors() {
        let response = call("teleport", json!({}));
        assert_eq!(response.error.unwrap().code, protocol_codes::METHOD_NOT_FOUND);
        let response = call("convert", json!({ "amount": "1" }));
        assert_eq!(response.error.unwrap().code, protocol_codes::INVALID_PARAMS);
        let response = call("convert", json!({ "amount": true, "from": "foot", "to": "meter" }));
        assert_eq!(response.error.unwrap().code, protocol_codes::INVALID_PARAMS);
        let response = call("convert", json!({ "amount": "1e99999999999999999", "from": "foot", "to": "meter" }));
        assert_eq!(response.error.unwrap().code, protocol_codes::INVALID_PARAMS);
        let response = call("convert", json!({ "amount": "1", "from": "per-1e99999999999-second", "to": "hertz" }));
        assert_eq!(response.error.unwrap().code, "PARSE_ERROR");
    }

    #[test]
    fn test_convertible_and_describe() {
        let response = call("convertible", json!({ "from": "mile-per-gallon", "to": "liter-per-100-kilometer" }));
        assert_eq!(response.result.unwrap()["convertible"], true);
        let response = call("describe", json!({ "unit": "newton" }));
        let result = response.result.unwrap();
        assert_eq!(result["quantity"], "force");
        assert_eq!(result["base_identifier"], "kilogram-meter-per-square-second");
    }

    #[test]
    fn test_catalog_listing() {
        let result = server().catalog();
        assert!(result["units"].as_array().unwrap().len() > 50);
        assert_eq!(result["base_units"][0], "candela");
    }

    #[test]
    fn test_response_shape() {
        let response = call("convert", json!({ "amount": "1", "from": "meter", "to": "second" }));
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["id"], 1);
        assert_eq!(wire["error"]["code"], "INCOMPATIBLE_UNITS");
        assert!(wire.get("result").is_none());
    }
}
