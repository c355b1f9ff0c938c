use std::time::Duration;

use anyhow::Result;
use tracing::info;

/// Verification-code dispatch collaborator. The HTTP variant talks to a
/// Resend-style transactional mail API; `LogOnly` is for development and
/// tests, where the code is written to the log instead of an inbox.
pub enum Mailer {
    Http {
        client: reqwest::Client,
        api_url: String,
        api_key: String,
        from: String,
    },
    LogOnly,
}

impl Mailer {
    pub fn http(api_url: String, api_key: String, from: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Mailer::Http {
            client,
            api_url,
            api_key,
            from,
        })
    }

    pub async fn send_verification(&self, to: &str, username: &str, code: &str) -> Result<()> {
        match self {
            Mailer::LogOnly => {
                info!(%username, %code, "mail dispatch disabled, verification code logged");
                Ok(())
            }
            Mailer::Http {
                client,
                api_url,
                api_key,
                from,
            } => {
                let body = serde_json::json!({
                    "from": from,
                    "to": [to],
                    "subject": "Murmur verification code",
                    "text": format!(
                        "Hi {username},\n\nYour verification code is {code}. \
                         It expires in one hour.\n\nIf you did not sign up, ignore this email.\n"
                    ),
                });

                let resp = client
                    .post(api_url)
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
                    .await?;

                if !resp.status().is_success() {
                    anyhow::bail!("mail provider returned {}", resp.status());
                }
                Ok(())
            }
        }
    }
}
