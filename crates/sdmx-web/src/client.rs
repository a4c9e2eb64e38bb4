use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use sdmx_core::{
    DataQuery, DataResponse, DataStructure, DataStructureRef, Dataflow, DataflowRef,
    FilteredCursor, Result, SdmxClient, SdmxError, StructureMessage,
};
use sdmx_csv::SdmxCsvCursor;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::source::{SDMX21, WebSource};

/// Media type of SDMX-JSON structure messages.
const STRUCTURE_JSON: &str = "application/vnd.sdmx.structure+json;version=1.0";

/// Media type of SDMX-CSV data messages.
const DATA_CSV: &str = "application/vnd.sdmx.data+csv;version=1.0.0";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Dialects this client can speak.
const DIALECTS: &[&str] = &[SDMX21];

/// Raw client for an SDMX 2.1 REST endpoint.
#[derive(Debug, Clone)]
pub struct SdmxWebClient {
    source: WebSource,
    http: Client,
}

fn network_error(e: reqwest::Error) -> SdmxError {
    SdmxError::Network(e.to_string())
}

impl SdmxWebClient {
    /// Creates a client with its own HTTP client.
    ///
    /// # Errors
    /// Returns [`SdmxError::NotSupported`] for an unknown dialect and
    /// [`SdmxError::Network`] if the HTTP client cannot be built.
    pub fn new(source: WebSource) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(network_error)?;
        Self::with_http_client(source, http)
    }

    /// Creates a client sharing an HTTP client.
    ///
    /// # Errors
    /// Returns [`SdmxError::NotSupported`] for an unknown dialect.
    pub fn with_http_client(source: WebSource, http: Client) -> Result<Self> {
        if !DIALECTS.contains(&source.dialect.as_str()) {
            return Err(SdmxError::NotSupported(format!(
                "dialect '{}' of source '{}'",
                source.dialect, source.id
            )));
        }
        Ok(Self { source, http })
    }

    /// Returns the source.
    #[must_use]
    pub const fn source(&self) -> &WebSource {
        &self.source
    }

    /// Appends path segments to the endpoint.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.source.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                SdmxError::InvalidParameter(format!(
                    "endpoint '{}' cannot be a base",
                    self.source.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn flows_url(&self) -> Result<Url> {
        self.url(&["dataflow", "all", "all", "latest"])
    }

    fn flow_url(&self, flow_ref: &DataflowRef) -> Result<Url> {
        self.url(&[
            "dataflow",
            flow_ref.agency(),
            flow_ref.id(),
            flow_ref.version(),
        ])
    }

    fn structure_url(&self, structure_ref: &DataStructureRef) -> Result<Url> {
        let mut url = self.url(&[
            "datastructure",
            structure_ref.agency(),
            structure_ref.id(),
            structure_ref.version(),
        ])?;
        url.query_pairs_mut().append_pair("references", "children");
        Ok(url)
    }

    fn data_url(&self, flow_ref: &DataflowRef, query: &DataQuery) -> Result<Url> {
        let flow = flow_ref.to_string();
        let key = query.key().to_string();
        let mut url = self.url(&["data", &flow, &key])?;
        url.query_pairs_mut()
            .append_pair("detail", query.detail().as_rest_param());
        Ok(url)
    }

    async fn get(&self, url: Url, accept: &str) -> Result<Response> {
        debug!(%url, "GET");
        self.http
            .get(url)
            .header(header::ACCEPT, accept)
            .header(header::ACCEPT_LANGUAGE, self.source.languages.as_str())
            .send()
            .await
            .map_err(network_error)
    }

    async fn get_structure_message(&self, url: Url) -> Result<Option<StructureMessage>> {
        let response = self.get(url.clone(), STRUCTURE_JSON).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SdmxError::Network(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }
        let body = response.bytes().await.map_err(network_error)?;
        StructureMessage::from_slice(&body).map(Some)
    }
}

#[async_trait]
impl SdmxClient for SdmxWebClient {
    fn name(&self) -> &str {
        &self.source.id
    }

    #[instrument(skip(self), fields(source = %self.source.id))]
    async fn test_client(&self) -> Result<()> {
        let response = self
            .get(self.flows_url()?, STRUCTURE_JSON)
            .await
            .map_err(|e| SdmxError::Unreachable {
                origin: self.source.endpoint.to_string(),
                reason: e.to_string(),
            })?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(SdmxError::SourceNotFound(
                self.source.endpoint.to_string(),
            )),
            status => Err(SdmxError::Unreachable {
                origin: self.source.endpoint.to_string(),
                reason: format!("HTTP {status}"),
            }),
        }
    }

    #[instrument(skip(self), fields(source = %self.source.id))]
    async fn get_flows(&self) -> Result<Vec<Dataflow>> {
        let message = self.get_structure_message(self.flows_url()?).await?;
        Ok(message.map(|m| m.flows).unwrap_or_default())
    }

    #[instrument(skip(self), fields(source = %self.source.id))]
    async fn get_flow(&self, flow_ref: &DataflowRef) -> Result<Dataflow> {
        self.get_structure_message(self.flow_url(flow_ref)?)
            .await?
            .and_then(|m| m.flows.into_iter().find(|f| flow_ref.contains(&f.flow_ref)))
            .ok_or_else(|| SdmxError::MissingFlow {
                origin: self.source.id.clone(),
                flow: flow_ref.to_string(),
            })
    }

    #[instrument(skip(self), fields(source = %self.source.id))]
    async fn get_structure(&self, structure_ref: &DataStructureRef) -> Result<DataStructure> {
        self.get_structure_message(self.structure_url(structure_ref)?)
            .await?
            .and_then(|m| {
                m.structures
                    .into_iter()
                    .find(|s| structure_ref.contains(s.structure_ref()))
            })
            .ok_or_else(|| SdmxError::MissingStructure {
                origin: self.source.id.clone(),
                structure: structure_ref.to_string(),
            })
    }

    #[instrument(skip(self, structure), fields(source = %self.source.id, flow = %flow_ref))]
    async fn get_data(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
        structure: &DataStructure,
    ) -> Result<DataResponse> {
        let url = self.data_url(flow_ref, query)?;
        let response = self.get(url.clone(), DATA_CSV).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No series matching the query");
            return Ok(DataResponse::Empty);
        }
        if !response.status().is_success() {
            return Err(SdmxError::Network(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }

        let body = response.bytes().await.map_err(network_error)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(DataResponse::Empty);
        }
        let cursor = SdmxCsvCursor::new(Cursor::new(body), structure)?;
        Ok(DataResponse::Cursor(FilteredCursor::wrap(
            Box::new(cursor),
            query,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdmx_core::{DataCursor, DataDetail, DataSet, Key, Languages};
    use wiremock::matchers::{header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STRUCTURE: &str = r#"{
      "data": {
        "dataflows": [{
          "id": "EXR", "agencyID": "ECB", "version": "1.0", "name": "Exchange Rates",
          "structure": "urn:sdmx:org.sdmx.infomodel.datastructure.DataStructure=ECB:ECB_EXR1(1.0)"
        }],
        "dataStructures": [{
          "id": "ECB_EXR1", "agencyID": "ECB", "version": "1.0",
          "dataStructureComponents": {
            "dimensionList": {
              "dimensions": [{"id": "FREQ", "position": 1}, {"id": "CURRENCY", "position": 2}],
              "timeDimensions": [{"id": "TIME_PERIOD"}]
            },
            "attributeList": {"attributes": [{"id": "TITLE"}]},
            "measureList": {"primaryMeasure": {"id": "OBS_VALUE"}}
          }
        }]
      }
    }"#;

    const DATA: &str = "\
DATAFLOW,FREQ,CURRENCY,TIME_PERIOD,OBS_VALUE,TITLE
ECB:EXR(1.0),A,CHF,2020,1.07,Swiss franc
ECB:EXR(1.0),A,CHF,2021,1.08,Swiss franc
";

    async fn client(server: &MockServer) -> SdmxWebClient {
        let endpoint = Url::parse(&format!("{}/service", server.uri())).unwrap();
        SdmxWebClient::new(WebSource::new("ECB", endpoint).with_languages(Languages::new("fr")))
            .unwrap()
    }

    fn structure_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(STRUCTURE, "application/json")
    }

    #[tokio::test]
    async fn test_get_flows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/dataflow/all/all/latest"))
            .and(header_is("accept-language", "fr"))
            .respond_with(structure_response())
            .mount(&server)
            .await;

        let flows = client(&server).await.get_flows().await.unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].flow_ref, DataflowRef::parse("ECB,EXR,1.0"));
    }

    #[tokio::test]
    async fn test_get_flow_and_structure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/dataflow/ECB/EXR/1.0"))
            .respond_with(structure_response())
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/service/datastructure/ECB/ECB_EXR1/1.0"))
            .and(query_param("references", "children"))
            .respond_with(structure_response())
            .mount(&server)
            .await;
        let client = client(&server).await;

        let flow = client.get_flow(&DataflowRef::parse("ECB,EXR,1.0")).await.unwrap();
        let structure = client.get_structure(&flow.structure_ref).await.unwrap();
        assert_eq!(
            structure.dimension_ids().collect::<Vec<_>>(),
            vec!["FREQ", "CURRENCY"]
        );

        let missing = client.get_flow(&DataflowRef::parse("ECB,STS,1.0")).await;
        assert!(matches!(missing, Err(SdmxError::MissingFlow { .. })));
    }

    #[tokio::test]
    async fn test_get_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/data/ECB,EXR,1.0/A.CHF"))
            .and(query_param("detail", "serieskeysonly"))
            .and(header_is("accept", DATA_CSV))
            .respond_with(ResponseTemplate::new(200).set_body_string(DATA))
            .mount(&server)
            .await;
        let client = client(&server).await;
        let flow_ref = DataflowRef::parse("ECB,EXR,1.0");
        let structure = StructureMessage::from_slice(STRUCTURE.as_bytes())
            .unwrap()
            .structures
            .remove(0);
        let query = DataQuery::of(Key::parse("A.CHF"), DataDetail::SeriesKeysOnly);

        let mut cursor = client
            .get_data(&flow_ref, &query, &structure)
            .await
            .unwrap()
            .into_cursor();
        let data_set = DataSet::from_cursor(flow_ref, query, cursor.as_mut()).unwrap();
        cursor.close().unwrap();

        let series = data_set.get_series(&Key::parse("A.CHF")).unwrap();
        assert!(series.obs().is_empty());
        assert_eq!(series.meta().get("TITLE").map(String::as_str), Some("Swiss franc"));
    }

    #[tokio::test]
    async fn test_get_data_not_found_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/data/ECB,EXR,1.0/all"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let structure = DataStructure::builder(DataStructureRef::parse("ECB,ECB_EXR1,1.0")).build();

        let response = client(&server)
            .await
            .get_data(&DataflowRef::parse("ECB,EXR,1.0"), &DataQuery::ALL, &structure)
            .await
            .unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let result = client(&server).await.get_flows().await;
        assert!(matches!(result, Err(SdmxError::Network(_))));
    }

    #[tokio::test]
    async fn test_test_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/service/dataflow/all/all/latest"))
            .respond_with(structure_response())
            .mount(&server)
            .await;
        client(&server).await.test_client().await.unwrap();

        let other = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&other)
            .await;
        assert!(matches!(
            client(&other).await.test_client().await,
            Err(SdmxError::SourceNotFound(_))
        ));

        let closed = Url::parse("http://127.0.0.1:1/service").unwrap();
        let unreachable = SdmxWebClient::new(WebSource::new("X", closed)).unwrap();
        assert!(matches!(
            unreachable.test_client().await,
            Err(SdmxError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_dialect() {
        let source = WebSource::new("X", Url::parse("http://localhost/").unwrap())
            .with_dialect("NBB");
        assert!(matches!(
            SdmxWebClient::new(source),
            Err(SdmxError::NotSupported(_))
        ));
    }
}
