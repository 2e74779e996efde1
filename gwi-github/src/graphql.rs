//! `gh api graphql` support for data the plain subcommands don't expose

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Error, GhClient, Result};

/// GraphQL query response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

/// A query variable
#[derive(Debug, Clone, Copy)]
pub(crate) enum Var<'a> {
    /// Passed with `-f` (always a string)
    Str(&'a str, &'a str),
    /// Passed with `-F` (typed: numbers, booleans)
    Int(&'a str, u64),
}

impl GhClient {
    /// Run a GraphQL query and decode its `data`
    pub(crate) async fn graphql<T: DeserializeOwned>(&self, query: &str, vars: &[Var<'_>]) -> Result<T> {
        let mut command = self.command(["api", "graphql", "-f"]).arg(format!("query={}", query));
        for var in vars {
            command = match *var {
                Var::Str(name, value) => command.arg("-f").arg(format!("{}={}", name, value)),
                Var::Int(name, value) => command.arg("-F").arg(format!("{}={}", name, value)),
            };
        }

        let output = self.run(&command).await?;
        let response: GraphQLResponse<T> = match serde_json::from_str(&output.stdout) {
            Ok(response) => response,
            Err(e) if output.success() => return Err(Error::Json(e)),
            Err(_) => {
                output.check(&command)?;
                return Err(Error::GraphQL("empty response".to_string()));
            }
        };

        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        match response.data {
            Some(data) => {
                if !messages.is_empty() {
                    warn!(errors = ?messages, "GraphQL returned partial data");
                }
                debug!("GraphQL query succeeded");
                Ok(data)
            }
            None if messages.is_empty() => Err(Error::GraphQL("response has no data".to_string())),
            None => Err(Error::GraphQL(messages.join("; "))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client;
    use gwi_core::testing::FakeInvoker;
    use gwi_core::ProcessOutput;
    use std::sync::Arc;

    #[derive(Debug, Deserialize)]
    struct Viewer {
        viewer: Login,
    }

    #[derive(Debug, Deserialize)]
    struct Login {
        login: String,
    }

    #[tokio::test]
    async fn test_variables_and_data() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "gh",
            &["api", "graphql"],
            ProcessOutput::ok(r#"{"data":{"viewer":{"login":"octo"}}}"#),
        );
        let viewer: Viewer = client(&fake)
            .graphql("query { viewer { login } }", &[Var::Str("owner", "acme"), Var::Int("number", 42)])
            .await
            .unwrap();
        assert_eq!(viewer.viewer.login, "octo");

        let args = &fake.calls()[0].args;
        assert_eq!(args[..3], ["api", "graphql", "-f"]);
        assert_eq!(args[3], "query=query { viewer { login } }");
        assert_eq!(args[4..], ["-f", "owner=acme", "-F", "number=42"]);
    }

    #[tokio::test]
    async fn test_errors_without_data() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "gh",
            &["api", "graphql"],
            ProcessOutput {
                code: Some(1),
                stdout: r#"{"data":null,"errors":[{"message":"Could not resolve to a node"}]}"#.to_string(),
                stderr: "gh: Could not resolve to a node".to_string(),
            },
        );
        let err = client(&fake)
            .graphql::<Viewer>("query", &[])
            .await
            .unwrap_err();
        match err {
            Error::GraphQL(msg) => assert!(msg.contains("Could not resolve")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", &["api", "graphql"], ProcessOutput::failed(1, "HTTP 502"));
        let err = client(&fake)
            .graphql::<Viewer>("query", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Core(gwi_core::Error::CommandFailed { .. })));
    }
}
