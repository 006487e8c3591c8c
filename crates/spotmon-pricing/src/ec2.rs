//! EC2 Query API spot price client
//!
//! Issues SigV4-signed `DescribeSpotPriceHistory` calls with
//! `StartTime = now`, so the result set is the currently advertised price
//! per (instance type, zone, product) rather than a history window. The
//! Query API answers XML; decoding lives here too, including the error
//! envelope that carries the machine-readable provider code.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4::SigningParams;
use aws_smithy_runtime_api::client::identity::Identity;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use spotmon_core::{AvailabilityZone, InstanceType, ProductDescription, SpotPriceSample};
use tracing::debug;

use crate::spot::{ProviderError, ProviderResult, SpotPriceProvider};

const EC2_API_VERSION: &str = "2016-11-15";

/// Per-request timeout so a wedged endpoint cannot block the loop.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// SigV4-signed `DescribeSpotPriceHistory` client.
pub struct Ec2SpotPriceClient {
    http: Client,
    region: String,
    credentials: Arc<dyn ProvideCredentials>,
}

impl Ec2SpotPriceClient {
    /// Resolve credentials from the default AWS provider chain
    /// (environment, shared config, instance metadata).
    pub async fn from_env(region: impl Into<String>) -> ProviderResult<Self> {
        let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let credentials = aws_config
            .credentials_provider()
            .ok_or_else(|| ProviderError::Credentials("no AWS credentials found".to_string()))?;

        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            region: region.into(),
            credentials: Arc::from(credentials),
        })
    }

    fn endpoint(&self) -> String {
        format!("https://ec2.{}.amazonaws.com/", self.region)
    }

    /// Sign the form body with SigV4 and return the headers to apply.
    async fn sign_request(&self, url: &str, body: &[u8]) -> ProviderResult<Vec<(String, String)>> {
        let creds = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| ProviderError::Credentials(e.to_string()))?;

        let expiry = creds.expiry();
        let identity = Identity::new(creds, expiry);

        let signing_params = SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name("ec2")
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ProviderError::Credentials(e.to_string()))?;

        let signable_request = SignableRequest::new(
            "POST",
            url,
            std::iter::empty::<(&str, &str)>(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| ProviderError::Credentials(e.to_string()))?;

        let (signing_instructions, _) = sign(signable_request, &signing_params.into())
            .map_err(|e| ProviderError::Credentials(e.to_string()))?
            .into_parts();

        Ok(signing_instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

#[async_trait]
impl SpotPriceProvider for Ec2SpotPriceClient {
    async fn describe_spot_prices(
        &self,
        instance_types: &BTreeSet<InstanceType>,
        zones: &BTreeSet<AvailabilityZone>,
        products: &[ProductDescription],
    ) -> ProviderResult<Vec<SpotPriceSample>> {
        let url = self.endpoint();
        let body = build_query(instance_types, zones, products, Utc::now());
        let body_bytes = body.into_bytes();

        let headers = self.sign_request(&url, &body_bytes).await?;

        let mut request = self
            .http
            .post(&url)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body_bytes);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let (code, message) = parse_error_response(&text).unwrap_or_else(|| {
                (
                    format!("Http{}", status.as_u16()),
                    text.chars().take(256).collect(),
                )
            });
            return Err(ProviderError::Api { code, message });
        }

        let samples = parse_spot_price_history(&text)?;
        debug!(samples = samples.len(), "Fetched spot prices");
        Ok(samples)
    }
}

/// Build the `DescribeSpotPriceHistory` form body. Zones go through the
/// `availability-zone` filter; types and products are positional members.
fn build_query(
    instance_types: &BTreeSet<InstanceType>,
    zones: &BTreeSet<AvailabilityZone>,
    products: &[ProductDescription],
    start_time: DateTime<Utc>,
) -> String {
    let mut params = vec![
        "Action=DescribeSpotPriceHistory".to_string(),
        format!("Version={EC2_API_VERSION}"),
        format!(
            "StartTime={}",
            urlencoding::encode(&start_time.to_rfc3339_opts(SecondsFormat::Secs, true))
        ),
        "Filter.1.Name=availability-zone".to_string(),
    ];

    for (i, zone) in zones.iter().enumerate() {
        params.push(format!(
            "Filter.1.Value.{}={}",
            i + 1,
            urlencoding::encode(zone.as_str())
        ));
    }
    for (i, instance_type) in instance_types.iter().enumerate() {
        params.push(format!(
            "InstanceType.{}={}",
            i + 1,
            urlencoding::encode(instance_type.as_str())
        ));
    }
    for (i, product) in products.iter().enumerate() {
        params.push(format!(
            "ProductDescription.{}={}",
            i + 1,
            urlencoding::encode(product.as_str())
        ));
    }

    params.join("&")
}

/// Decode `DescribeSpotPriceHistoryResponse` XML into samples.
///
/// Records whose product falls outside the fixed descriptor set are
/// skipped; the query filters by product, so this only drops records a
/// newer API revision might introduce.
fn parse_spot_price_history(xml: &str) -> ProviderResult<Vec<SpotPriceSample>> {
    #[derive(Default)]
    struct PartialSample {
        instance_type: Option<String>,
        zone: Option<String>,
        price: Option<f64>,
        product: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    }

    let mut reader = Reader::from_str(xml);
    let mut samples = Vec::new();
    let mut current: Option<PartialSample> = None;
    let mut field: Option<Vec<u8>> = None;

    loop {
        match reader
            .read_event()
            .map_err(|e| ProviderError::Decode(e.to_string()))?
        {
            Event::Start(e) => match e.name().as_ref() {
                b"item" => current = Some(PartialSample::default()),
                name @ (b"instanceType" | b"availabilityZone" | b"spotPrice"
                | b"productDescription" | b"timestamp") => field = Some(name.to_vec()),
                _ => field = None,
            },
            Event::Text(t) => {
                let (Some(sample), Some(name)) = (current.as_mut(), field.as_deref()) else {
                    continue;
                };
                let text = t
                    .unescape()
                    .map_err(|e| ProviderError::Decode(e.to_string()))?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match name {
                    b"instanceType" => sample.instance_type = Some(text.to_string()),
                    b"availabilityZone" => sample.zone = Some(text.to_string()),
                    b"spotPrice" => {
                        sample.price = Some(text.parse().map_err(|_| {
                            ProviderError::Decode(format!("unparseable spot price {text:?}"))
                        })?)
                    }
                    b"productDescription" => sample.product = Some(text.to_string()),
                    b"timestamp" => {
                        let parsed = DateTime::parse_from_rfc3339(text).map_err(|_| {
                            ProviderError::Decode(format!("unparseable timestamp {text:?}"))
                        })?;
                        sample.timestamp = Some(parsed.with_timezone(&Utc));
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                field = None;
                if e.name().as_ref() == b"item" {
                    if let Some(partial) = current.take() {
                        if let (Some(ty), Some(zone), Some(price), Some(product), Some(ts)) = (
                            partial.instance_type,
                            partial.zone,
                            partial.price,
                            partial.product,
                            partial.timestamp,
                        ) {
                            if let Ok(product) = product.parse::<ProductDescription>() {
                                samples.push(SpotPriceSample {
                                    instance_type: InstanceType::new(ty),
                                    availability_zone: AvailabilityZone::new(zone),
                                    price,
                                    product,
                                    timestamp: ts,
                                });
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(samples)
}

/// Extract `(code, message)` from an EC2 error envelope.
fn parse_error_response(xml: &str) -> Option<(String, String)> {
    let mut reader = Reader::from_str(xml);
    let mut code = None;
    let mut message = None;
    let mut field: Option<Vec<u8>> = None;

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => match e.name().as_ref() {
                name @ (b"Code" | b"Message") => field = Some(name.to_vec()),
                _ => field = None,
            },
            Event::Text(t) => {
                let text = t.unescape().ok()?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match field.as_deref() {
                    Some(b"Code") if code.is_none() => code = Some(text.to_string()),
                    Some(b"Message") if message.is_none() => message = Some(text.to_string()),
                    _ => {}
                }
            }
            Event::End(_) => field = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Some((code?, message.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DescribeSpotPriceHistoryResponse xmlns="http://ec2.amazonaws.com/doc/2016-11-15/">
    <requestId>59dbff89-35bd-4eac-99ed-be587EXAMPLE</requestId>
    <spotPriceHistorySet>
        <item>
            <instanceType>m5.large</instanceType>
            <productDescription>Linux/UNIX</productDescription>
            <spotPrice>0.042100</spotPrice>
            <timestamp>2024-01-15T12:00:00.000Z</timestamp>
            <availabilityZone>us-east-1a</availabilityZone>
        </item>
        <item>
            <instanceType>c5.xlarge</instanceType>
            <productDescription>Linux/UNIX (Amazon VPC)</productDescription>
            <spotPrice>0.081300</spotPrice>
            <timestamp>2024-01-15T12:00:00.000Z</timestamp>
            <availabilityZone>us-east-1b</availabilityZone>
        </item>
    </spotPriceHistorySet>
</DescribeSpotPriceHistoryResponse>"#;

    const ERROR_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Errors>
        <Error>
            <Code>RequestLimitExceeded</Code>
            <Message>Request limit exceeded.</Message>
        </Error>
    </Errors>
    <RequestID>3e915a82-aa9e-467e-b4smEXAMPLE</RequestID>
</Response>"#;

    #[test]
    fn test_parse_history() {
        let samples = parse_spot_price_history(HISTORY_XML).unwrap();
        assert_eq!(samples.len(), 2);

        assert_eq!(samples[0].instance_type, InstanceType::new("m5.large"));
        assert_eq!(
            samples[0].availability_zone,
            AvailabilityZone::new("us-east-1a")
        );
        assert_eq!(samples[0].price, 0.0421);
        assert_eq!(samples[0].product, ProductDescription::LinuxUnix);

        assert_eq!(samples[1].product, ProductDescription::LinuxUnixVpc);
    }

    #[test]
    fn test_parse_history_skips_unknown_product() {
        let xml = HISTORY_XML.replace("Linux/UNIX (Amazon VPC)", "Red Hat Enterprise Linux");
        let samples = parse_spot_price_history(&xml).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].instance_type, InstanceType::new("m5.large"));
    }

    #[test]
    fn test_parse_error_envelope() {
        let (code, message) = parse_error_response(ERROR_XML).unwrap();
        assert_eq!(code, "RequestLimitExceeded");
        assert_eq!(message, "Request limit exceeded.");

        let err = ProviderError::Api { code, message };
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_parse_error_envelope_tolerates_garbage() {
        assert_eq!(parse_error_response("not xml at all"), None);
    }

    #[test]
    fn test_build_query() {
        let types = BTreeSet::from([InstanceType::new("m5.large")]);
        let zones = BTreeSet::from([
            AvailabilityZone::new("us-east-1a"),
            AvailabilityZone::new("us-east-1b"),
        ]);
        let products = [ProductDescription::LinuxUnix];
        let start = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let query = build_query(&types, &zones, &products, start);

        assert!(query.starts_with("Action=DescribeSpotPriceHistory&Version=2016-11-15"));
        assert!(query.contains("StartTime=2024-01-15T12%3A00%3A00Z"));
        assert!(query.contains("Filter.1.Name=availability-zone"));
        assert!(query.contains("Filter.1.Value.1=us-east-1a"));
        assert!(query.contains("Filter.1.Value.2=us-east-1b"));
        assert!(query.contains("InstanceType.1=m5.large"));
        assert!(query.contains("ProductDescription.1=Linux%2FUNIX"));
    }
}
