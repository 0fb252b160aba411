use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use trainer_core::puzzle::{BlunderFetchOptions, BlunderPuzzle, Puzzle, PuzzleFetchOptions};
use trainer_core::repertoire::tree::RepertoireTree;
use trainer_core::repertoire::RepertoireGrade;

use crate::config::Config;
use crate::error::ClientError;

#[derive(Debug, Deserialize)]
struct TacticResponse {
    tactic: Puzzle,
}

/// Puzzle and grading service
pub struct TrainerApi {
    client: Client,
    base_url: String,
}

impl TrainerApi {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent("ChessTrainer/1.0")
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let resp = self.client.post(&url).json(body).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status(),
                url,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn fetch_puzzle(&self, options: &PuzzleFetchOptions) -> Result<Puzzle, ClientError> {
        let resp: TacticResponse = self.post("/api/v2/tactic", options).await?;
        tracing::info!(puzzle_id = %resp.tactic.id, rating = resp.tactic.rating, "Fetched puzzle");
        Ok(resp.tactic)
    }

    pub async fn fetch_blunder_puzzles(
        &self,
        options: &BlunderFetchOptions,
    ) -> Result<Vec<BlunderPuzzle>, ClientError> {
        let puzzles: Vec<BlunderPuzzle> = self.post("/api/v1/blunder_puzzle", options).await?;
        tracing::info!(count = puzzles.len(), "Fetched blunder puzzles");
        Ok(puzzles)
    }

    pub async fn grade_opening(&self, tree: &RepertoireTree) -> Result<RepertoireGrade, ClientError> {
        self.post("/api/v1/grade_opening", tree).await
    }
}
