use async_trait::async_trait;
use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, Database};

use crate::error::{MongoErrorExt, MongoResult};
use crate::store::{DocumentStore, FindQuery};

/// [`DocumentStore`] backed by a MongoDB server.
///
/// Free-text search without named fields uses `$text`, which needs a text
/// index on the collection.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> MongoResult<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| e.into_data_error())?;
        let database = client.database(database);
        tracing::info!(database = %database.name(), "document store connected");
        Ok(Self { client, database })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn count(&self, collection: &str, filter: Document) -> MongoResult<u64> {
        self.collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| e.into_data_error())
    }

    async fn find(&self, collection: &str, query: FindQuery) -> MongoResult<Vec<Document>> {
        let coll = self.collection(collection);
        let mut find = coll.find(query.filter).sort(query.sort);
        if let Some(skip) = query.skip {
            find = find.skip(skip);
        }
        if let Some(limit) = query.limit {
            find = find.limit(limit);
        }
        if let Some(projection) = query.projection {
            find = find.projection(projection);
        }
        let cursor = find.await.map_err(|e| e.into_data_error())?;
        cursor.try_collect().await.map_err(|e| e.into_data_error())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> MongoResult<Option<Document>> {
        self.collection(collection)
            .find_one(filter)
            .await
            .map_err(|e| e.into_data_error())
    }

    async fn insert(&self, collection: &str, document: Document) -> MongoResult<()> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map(|_| ())
            .map_err(|e| e.into_data_error())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> MongoResult<Option<Document>> {
        self.collection(collection)
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| e.into_data_error())
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> MongoResult<Option<Document>> {
        self.collection(collection)
            .find_one_and_delete(filter)
            .await
            .map_err(|e| e.into_data_error())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        tracing::info!(database = %self.database.name(), "document store closed");
    }
}
