use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::debug;

use crate::dao::{
    models::{
        AnswerQuery, CardAnswer, DeckStats, DeckStatsMap, UserId, sort_most_recent_first,
    },
    remote_store::RemoteStatsStore,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchAnswerDocument, CouchDeckStatsDocument, END_SUFFIX, answer_prefix,
        stats_doc_id, stats_prefix,
    },
};

/// Remote store backed by a CouchDB database reached over HTTP.
#[derive(Clone)]
pub struct CouchRemoteStore {
    client: Client,
    database_url: Arc<Url>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchRemoteStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = config.base_url.trim_end_matches('/');
        let invalid = || CouchDaoError::InvalidBaseUrl {
            url: base_url.to_string(),
        };
        let mut database_url = Url::parse(base_url).map_err(|_| invalid())?;
        database_url
            .path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(&config.database);

        let auth = config
            .credentials
            .map(|creds| (Arc::<str>::from(creds.username), Arc::<str>::from(creds.password)));

        let store = Self {
            client,
            database_url: Arc::new(database_url),
            database: Arc::<str>::from(config.database),
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, doc_id: &str) -> reqwest::RequestBuilder {
        let mut url = (*self.database_url).clone();
        // `connect` only keeps URLs that can carry path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(doc_id);
        }
        self.with_auth(self.client.request(method, url))
    }

    /// Create the stats database when it does not exist yet.
    async fn ensure_database(&self) -> CouchResult<()> {
        let url = (*self.database_url).clone();
        let target = self.database.as_ref();

        let status = self
            .with_auth(self.client.get(url.clone()))
            .send()
            .await
            .map_err(CouchDaoError::transport(target))?
            .status();
        if status.is_success() {
            return Ok(());
        }
        if status != StatusCode::NOT_FOUND {
            return Err(CouchDaoError::status(target, status));
        }

        let created = self
            .with_auth(self.client.put(url))
            .send()
            .await
            .map_err(CouchDaoError::transport(target))?
            .status();
        // 412: another replica created it first.
        if created.is_success() || created == StatusCode::PRECONDITION_FAILED {
            debug!(database = target, "created CouchDB stats database");
            Ok(())
        } else {
            Err(CouchDaoError::status(target, created))
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(CouchDaoError::transport(doc_id))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(CouchDaoError::transport(doc_id)),
            status => Err(CouchDaoError::status(doc_id, status)),
        }
    }

    /// PUT a document and hand back the status; conflicts mean different things per caller.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<StatusCode>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(CouchDaoError::transport(doc_id))?;
        Ok(response.status())
    }

    /// Every document whose id starts with `prefix`.
    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let key = |value: String| {
            serde_json::to_string(&value).map_err(|source| CouchDaoError::Document {
                target: ALL_DOCS.to_string(),
                source,
            })
        };
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", key(prefix.to_string())?),
            ("endkey", key(format!("{prefix}{END_SUFFIX}"))?),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(CouchDaoError::transport(ALL_DOCS))?;
        if !response.status().is_success() {
            return Err(CouchDaoError::status(ALL_DOCS, response.status()));
        }

        let payload = response
            .json::<AllDocsResponse>()
            .await
            .map_err(CouchDaoError::transport(ALL_DOCS))?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc.map(|doc| (row.id, doc)))
            .map(|(id, doc)| {
                from_value(doc).map_err(|source| CouchDaoError::Document { target: id, source })
            })
            .collect()
    }
}

impl RemoteStatsStore for CouchRemoteStore {
    fn upsert_deck_stats(
        &self,
        user: UserId,
        deck: String,
        stats: DeckStats,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = stats_doc_id(&user, &deck);
            let rev = store
                .get_document::<CouchDeckStatsDocument>(&doc_id)
                .await?
                .and_then(|existing| existing.rev);
            let doc = CouchDeckStatsDocument::new(user, deck, stats, rev);
            let status = store.put_document(&doc_id, &doc).await?;
            if status.is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::status(doc_id, status).into())
            }
        })
    }

    fn insert_card_answer(
        &self,
        user: UserId,
        answer: CardAnswer,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchAnswerDocument::new(user, answer);
            match store.put_document(&doc.id, &doc).await? {
                status if status.is_success() => Ok(()),
                StatusCode::CONFLICT => {
                    debug!(doc_id = %doc.id, "answer already stored remotely");
                    Ok(())
                }
                status => Err(CouchDaoError::status(doc.id, status).into()),
            }
        })
    }

    fn fetch_deck_stats(&self, user: UserId) -> BoxFuture<'static, StorageResult<DeckStatsMap>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store
                .list_documents::<CouchDeckStatsDocument>(&stats_prefix(&user))
                .await?;
            Ok(docs
                .into_iter()
                .filter(|doc| doc.belongs_to(&user))
                .map(|doc| doc.into_entry())
                .collect())
        })
    }

    fn fetch_card_answers(
        &self,
        user: UserId,
        query: AnswerQuery,
    ) -> BoxFuture<'static, StorageResult<Vec<CardAnswer>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store
                .list_documents::<CouchAnswerDocument>(&answer_prefix(&user))
                .await?;
            let mut answers: Vec<CardAnswer> = docs
                .into_iter()
                .filter(|doc| doc.belongs_to(&user))
                .map(CardAnswer::from)
                .filter(|answer| query.deck.as_ref().is_none_or(|deck| &answer.deck == deck))
                .collect();
            sort_most_recent_first(&mut answers);
            if let Some(limit) = query.limit {
                answers.truncate(limit);
            }
            Ok(answers)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let target = store.database.as_ref();
            let status = store
                .with_auth(store.client.get((*store.database_url).clone()))
                .send()
                .await
                .map_err(CouchDaoError::transport(target))?
                .status();

            if status.is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::status(target, status).into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
