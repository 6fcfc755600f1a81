use std::time::Duration;

use serde::{Deserialize, Deserializer};

use super::{BoxedLookupFuture, LookupError, PostalAddress, PostalCode, PostalDirectory};

pub const DEFAULT_VIACEP_URL: &str = "https://viacep.com.br/ws";

/// ViaCEP over HTTPS: `GET {base_url}/{cep}/json/`.
#[derive(Clone)]
pub struct ViaCepDirectory {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ViaCepDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self, code: &PostalCode) -> String {
        format!("{}/{}/json/", self.base_url, code.digits())
    }
}

impl Default for ViaCepDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_VIACEP_URL, Duration::from_secs(5))
    }
}

impl PostalDirectory for ViaCepDirectory {
    fn find<'a>(&'a self, code: &'a PostalCode) -> BoxedLookupFuture<'a> {
        Box::pin(async move {
            let url = self.endpoint(code);
            tracing::debug!(%url, "querying viacep");
            let response = self
                .client
                .get(&url)
                .timeout(self.timeout)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LookupError::Status(status.as_u16()));
            }
            let body = response.text().await?;
            parse_response(&body)
        })
    }
}

#[derive(Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default, deserialize_with = "flag")]
    erro: bool,
}

// Older deployments send `"erro": "true"` instead of a boolean.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Text(value) => value.eq_ignore_ascii_case("true"),
    })
}

/// Decodes a ViaCEP JSON body; an `erro` flag means the CEP is unknown.
pub fn parse_response(body: &str) -> Result<Option<PostalAddress>, LookupError> {
    let response: ViaCepResponse = serde_json::from_str(body)?;
    if response.erro {
        return Ok(None);
    }
    Ok(Some(PostalAddress {
        street: response.logradouro,
        neighborhood: response.bairro,
        city: response.localidade,
        state: response.uf,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_found_address() {
        let body = r#"{
            "cep": "01001-000",
            "logradouro": "Praça da Sé",
            "complemento": "lado ímpar",
            "bairro": "Sé",
            "localidade": "São Paulo",
            "uf": "SP",
            "ibge": "3550308"
        }"#;
        let address = parse_response(body).expect("decodes").expect("found");
        assert_eq!(
            address,
            PostalAddress {
                street: "Praça da Sé".into(),
                neighborhood: "Sé".into(),
                city: "São Paulo".into(),
                state: "SP".into(),
            }
        );
    }

    #[test]
    fn erro_flag_means_not_found() {
        assert_eq!(parse_response(r#"{"erro": true}"#).expect("decodes"), None);
        assert_eq!(parse_response(r#"{"erro": "true"}"#).expect("decodes"), None);
    }

    #[test]
    fn city_wide_codes_have_empty_street() {
        let body = r#"{"cep": "69945-000", "logradouro": "", "bairro": "", "localidade": "Acrelândia", "uf": "AC"}"#;
        let address = parse_response(body).expect("decodes").expect("found");
        assert!(address.street.is_empty());
        assert_eq!(address.city, "Acrelândia");
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(
            parse_response("<html>"),
            Err(LookupError::Decode(_))
        ));
    }

    #[test]
    fn endpoint_uses_bare_digits() {
        let directory = ViaCepDirectory::new("http://localhost:9000/ws/", Duration::from_secs(1));
        let code = PostalCode::parse("01001-000").expect("code");
        assert_eq!(
            directory.endpoint(&code),
            "http://localhost:9000/ws/01001000/json/"
        );
    }
}
