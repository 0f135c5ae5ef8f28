use serde::{Deserialize, Serialize};
use serde_json::Value;
use ureq::Agent;

use crate::{
    error::Error,
    record::{Record, RecordId, SwayVariant},
};

/// Rows carrying a shorter image reference are leftovers of failed uploads.
const MIN_IMAGE_REF_LEN: usize = 20;

/// Spreadsheet-backed store of records.
pub trait RemoteStore {
    /// Fetch every row.  There is no pagination.
    fn fetch_all(&self) -> Result<Vec<RemoteRow>, Error>;

    /// Append a record.  `record.image_ref` carries the base64 image payload.
    fn create(&self, record: &Record) -> Result<(), Error>;

    fn update(&self, id: &RecordId, title: &str, caption: &str) -> Result<(), Error>;

    fn delete(&self, id: &RecordId) -> Result<(), Error>;
}

/// One spreadsheet row as served by the endpoint.  Cells are kept loosely
/// typed, the spreadsheet happily turns ids and rotations into numbers.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteRow {
    pub id: Value,
    pub date: Value,
    pub title: Value,
    pub description: Value,
    pub image_url: Value,
    pub rotation: Value,
    pub sway_class: Value,
}

impl RemoteRow {
    /// Lenient decoding of one array element.  Anything that is not a row
    /// object becomes an empty row, which `into_record` turns down.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_else(|err| {
                log::debug!("unreadable row: {}", err);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Map the row onto a record, or `None` for rows that cannot be shown.
    pub fn into_record(self) -> Option<Record> {
        let id = cell_text(&self.id).filter(|id| !id.is_empty())?;
        let image_ref = cell_text(&self.image_url)?;
        if image_ref.len() <= MIN_IMAGE_REF_LEN || image_ref.contains("undefined") {
            return None;
        }
        Some(Record {
            id: RecordId::from(id),
            image_ref,
            title: cell_text(&self.title).unwrap_or_default(),
            caption: cell_text(&self.description).unwrap_or_default(),
            created_at: cell_text(&self.date).unwrap_or_default(),
            rotation: cell_number(&self.rotation).unwrap_or(0.0),
            sway_variant: cell_text(&self.sway_class)
                .as_deref()
                .and_then(SwayVariant::from_class),
        })
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn cell_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum Mutation<'a> {
    #[serde(rename_all = "camelCase")]
    Create {
        id: &'a RecordId,
        date: &'a str,
        title: &'a str,
        description: &'a str,
        rotation: f64,
        sway_class: &'a str,
        image_base64: &'a str,
    },
    Update {
        id: &'a RecordId,
        title: &'a str,
        description: &'a str,
    },
    Delete {
        id: &'a RecordId,
    },
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Debug, Deserialize)]
struct MutationReply {
    status: Status,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client of the spreadsheet web-app endpoint.
pub struct SheetStore {
    agent: Agent,
    url: String,
}

impl SheetStore {
    pub fn new(agent: Agent, url: impl Into<String>) -> Self {
        Self {
            agent,
            url: url.into(),
        }
    }

    /// POST a mutation and interpret the `{status}` reply.  The body goes out
    /// as `text/plain`, the endpoint cannot answer a CORS pre-flight.
    fn send(&self, mutation: &Mutation) -> Result<(), Error> {
        let body = serde_json::to_string(mutation)?;
        let mut response = self
            .agent
            .post(self.url.as_str())
            .header("Content-Type", "text/plain;charset=utf-8")
            .send(body)?;
        let reply: MutationReply = response.body_mut().read_json()?;
        match reply.status {
            Status::Success => Ok(()),
            Status::Error => Err(Error::Rejected(reply.message.unwrap_or_default())),
        }
    }
}

impl RemoteStore for SheetStore {
    fn fetch_all(&self) -> Result<Vec<RemoteRow>, Error> {
        let mut response = self.agent.get(self.url.as_str()).call()?;
        let cells: Vec<Value> = response.body_mut().read_json()?;
        log::debug!("fetched {} rows", cells.len());
        Ok(cells.into_iter().map(RemoteRow::from_value).collect())
    }

    fn create(&self, record: &Record) -> Result<(), Error> {
        self.send(&Mutation::Create {
            id: &record.id,
            date: &record.created_at,
            title: &record.title,
            description: &record.caption,
            rotation: record.rotation,
            sway_class: record.sway_variant.map_or("", SwayVariant::as_class),
            image_base64: &record.image_ref,
        })
    }

    fn update(&self, id: &RecordId, title: &str, caption: &str) -> Result<(), Error> {
        self.send(&Mutation::Update {
            id,
            title,
            description: caption,
        })
    }

    fn delete(&self, id: &RecordId) -> Result<(), Error> {
        self.send(&Mutation::Delete { id })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::util::default_ureq_agent;
    use serde_json::json;
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
        time::Duration,
    };

    /// Raw request as seen by the responder.
    pub struct Captured {
        pub request_line: String,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl Captured {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Answer exactly one HTTP request with `status` and a JSON `body`.
    pub fn respond_once(status: u16, body: &str) -> (String, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/exec", listener.local_addr().unwrap());
        let body = body.to_owned();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((key, value)) = line.split_once(':') {
                    headers.push((key.trim().to_owned(), value.trim().to_owned()));
                }
            }
            let length = headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.parse::<usize>().ok())
                .unwrap_or(0);
            let mut request_body = vec![0; length];
            reader.read_exact(&mut request_body).unwrap();

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();

            Captured {
                request_line: request_line.trim_end().to_owned(),
                headers,
                body: String::from_utf8(request_body).unwrap(),
            }
        });
        (url, handle)
    }

    fn store(url: String) -> SheetStore {
        SheetStore::new(default_ureq_agent(None, Duration::from_secs(5)), url)
    }

    fn row(value: serde_json::Value) -> RemoteRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rows_with_numeric_cells_are_normalized() {
        let record = row(json!({
            "id": 1672531200000u64,
            "date": "2023-01-01T00:00:00.000Z",
            "title": "Beach",
            "description": "",
            "imageUrl": "https://drive.google.com/thumbnail?sz=w1000&id=abc",
            "rotation": "-2.5",
            "swayClass": "sway-slow"
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.id.as_str(), "1672531200000");
        assert_eq!(record.rotation, -2.5);
        assert_eq!(record.sway_variant, Some(SwayVariant::Slow));
    }

    #[test]
    fn unusable_rows_are_rejected() {
        let good_image = "https://drive.google.com/thumbnail?sz=w1000&id=abc";
        assert!(row(json!({"imageUrl": good_image})).into_record().is_none());
        assert!(row(json!({"id": "", "imageUrl": good_image}))
            .into_record()
            .is_none());
        assert!(row(json!({"id": "1", "imageUrl": "https://short"}))
            .into_record()
            .is_none());
        assert!(row(json!({"id": "1", "imageUrl": "data:image/jpeg;base64,undefined"}))
            .into_record()
            .is_none());
        assert!(row(json!({"id": "1", "imageUrl": good_image, "swayClass": ""}))
            .into_record()
            .is_some_and(|record| record.sway_variant.is_none()));
    }

    #[test]
    fn fetch_all_reads_rows() {
        let (url, server) = respond_once(
            200,
            r#"[{"id":"1","date":"2023-01-01","title":"Beach","description":"Ombak","imageUrl":"https://drive.google.com/thumbnail?sz=w1000&id=beach","rotation":1,"swayClass":"sway-fast"},{"id":"","imageUrl":""}]"#,
        );
        let rows = store(url).fetch_all().unwrap();
        let captured = server.join().unwrap();

        assert!(captured.request_line.starts_with("GET /exec"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, json!("Beach"));
    }

    #[test]
    fn junk_elements_do_not_spoil_the_fetch() {
        let (url, server) = respond_once(
            200,
            r#"[{"id":"1","date":"2023-01-01","title":"Beach","description":"","imageUrl":"https://drive.google.com/thumbnail?sz=w1000&id=beach"},null,"junk",42]"#,
        );
        let rows = store(url).fetch_all().unwrap();
        server.join().unwrap();

        assert_eq!(rows.len(), 4);
        let records: Vec<Record> = rows.into_iter().filter_map(RemoteRow::into_record).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Beach");
    }

    #[test]
    fn create_posts_plain_text_with_image_payload() {
        let (url, server) = respond_once(200, r#"{"status":"success","action":"create"}"#);
        let record = Record {
            id: "1700000000000".into(),
            image_ref: "aGVsbG8=".into(),
            title: "Pantai".into(),
            caption: "Sore".into(),
            created_at: "2023-11-14T22:13:20.000Z".into(),
            rotation: 1.25,
            sway_variant: Some(SwayVariant::Medium),
        };
        store(url).create(&record).unwrap();
        let captured = server.join().unwrap();

        assert!(captured.request_line.starts_with("POST /exec"));
        assert_eq!(
            captured.header("content-type"),
            Some("text/plain;charset=utf-8")
        );
        let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(
            sent,
            json!({
                "action": "create",
                "id": "1700000000000",
                "date": "2023-11-14T22:13:20.000Z",
                "title": "Pantai",
                "description": "Sore",
                "rotation": 1.25,
                "swayClass": "sway-medium",
                "imageBase64": "aGVsbG8="
            })
        );
    }

    #[test]
    fn error_status_is_a_rejection() {
        let (url, server) = respond_once(200, r#"{"status":"error","message":"ID not found"}"#);
        let err = store(url).delete(&"42".into()).unwrap_err();
        let captured = server.join().unwrap();

        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&captured.body).unwrap(),
            json!({"action": "delete", "id": "42"})
        );
        assert!(matches!(&err, Error::Rejected(msg) if msg == "ID not found"));
        assert!(err.is_network());
    }

    #[test]
    fn update_sends_title_and_description() {
        let (url, server) = respond_once(200, r#"{"status":"success"}"#);
        store(url)
            .update(&"7".into(), "Judul baru", "Cerita baru")
            .unwrap();
        let captured = server.join().unwrap();

        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&captured.body).unwrap(),
            json!({"action": "update", "id": "7", "title": "Judul baru", "description": "Cerita baru"})
        );
    }

    #[test]
    fn server_errors_surface_as_network_errors() {
        let (url, server) = respond_once(500, r#"{"error":"boom"}"#);
        let err = store(url).fetch_all().unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, Error::NetworkError(_)));
    }
}
