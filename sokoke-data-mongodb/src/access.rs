use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use sokoke_data::value::now;
use sokoke_data::{
    DataAccess, DataError, Entity, QueryPlan, Relation, RelationKind, SearchMetadata, SearchResult,
    SearchSpec, Value,
};

use crate::compile::{compile_search, to_bson};
use crate::error::MongoResult;
use crate::mapper::{DocumentMapper, DocumentReader};
use crate::store::{DocumentStore, FindQuery};

/// [`DataAccess`] over any [`DocumentStore`].
///
/// Single-record operations return every relation populated, to-one and
/// to-many; `read_all` populates only the relations the search asks for.
///
/// # Example
///
/// ```ignore
/// let store: Arc<dyn DocumentStore> = Arc::new(MongoStore::connect(uri, "planner").await?);
/// let access: Arc<dyn DataAccess<Feature>> = Arc::new(MongoDataAccess::<Feature>::new(store));
/// ```
pub struct MongoDataAccess<E> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> MongoDataAccess<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

impl<E> Clone for MongoDataAccess<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

/// Map canonical names to document keys, coercing each value to the field's kind.
fn document_of<E: Entity>(values: Vec<(&'static str, Value)>) -> MongoResult<Document> {
    let mut document = Document::new();
    for (name, value) in values {
        let field = E::field(name).ok_or_else(|| DataError::unknown_field(E::name(), name))?;
        document.insert(field.document, to_bson(&value.coerce(field.kind)));
    }
    Ok(document)
}

/// Distinct string values stored under `key`.
fn distinct_strings(documents: &[Document], key: &str) -> Vec<String> {
    let mut values: Vec<String> = documents
        .iter()
        .filter_map(|d| d.get_str(key).ok())
        .map(str::to_string)
        .collect();
    values.sort_unstable();
    values.dedup();
    values
}

fn by_id(id: &str) -> Document {
    doc! { "_id": id }
}

impl<E: DocumentMapper> MongoDataAccess<E> {
    /// Resolve `relations` on `documents`.
    ///
    /// A to-one reference id is replaced by the related document; ids without
    /// a matching document are left as they are. A to-many relation is stored
    /// as an array of child documents, ordered by id, under the relation name.
    async fn populate(&self, documents: &mut [Document], relations: &[&'static Relation]) -> MongoResult<()> {
        for relation in relations {
            match relation.kind {
                RelationKind::ToOne => self.populate_one(documents, relation).await?,
                RelationKind::ToMany { .. } => self.populate_many(documents, relation).await?,
            }
            tracing::debug!(entity = E::name(), relation = relation.name, "relation populated");
        }
        Ok(())
    }

    async fn populate_one(&self, documents: &mut [Document], relation: &Relation) -> MongoResult<()> {
        let key = E::field(relation.name)
            .map(|f| f.document)
            .unwrap_or(relation.name);

        let ids = distinct_strings(documents, key);
        if ids.is_empty() {
            return Ok(());
        }

        let related = self
            .store
            .find(
                relation.collection,
                FindQuery {
                    filter: doc! { "_id": { "$in": ids } },
                    ..Default::default()
                },
            )
            .await?;
        let related: HashMap<String, Document> = related
            .into_iter()
            .filter_map(|d| d.get_str("_id").ok().map(str::to_string).map(|id| (id, d)))
            .collect();

        for document in documents.iter_mut() {
            let target = document
                .get_str(key)
                .ok()
                .and_then(|id| related.get(id))
                .cloned();
            if let Some(target) = target {
                document.insert(key, Bson::Document(target));
            }
        }
        Ok(())
    }

    async fn populate_many(&self, documents: &mut [Document], relation: &Relation) -> MongoResult<()> {
        let foreign_key = relation
            .foreign_key()
            .ok_or_else(|| DataError::unknown_field(relation.name, "foreign key"))?;

        let ids = distinct_strings(documents, "_id");
        let mut by_owner: HashMap<String, Vec<Bson>> = HashMap::new();
        if !ids.is_empty() {
            let mut filter = Document::new();
            filter.insert(foreign_key.document, doc! { "$in": ids });
            let children = self
                .store
                .find(
                    relation.collection,
                    FindQuery {
                        filter,
                        sort: doc! { "_id": 1 },
                        ..Default::default()
                    },
                )
                .await?;
            for child in children {
                if let Ok(owner) = child.get_str(foreign_key.document) {
                    let owner = owner.to_string();
                    by_owner.entry(owner).or_default().push(Bson::Document(child));
                }
            }
        }

        for document in documents.iter_mut() {
            let children = document
                .get_str("_id")
                .ok()
                .and_then(|id| by_owner.get(id))
                .cloned()
                .unwrap_or_default();
            document.insert(relation.name, Bson::Array(children));
        }
        Ok(())
    }

    /// Populate every relation and map one document.
    async fn finish(&self, document: Document) -> MongoResult<E> {
        let relations: Vec<&'static Relation> = E::relations().iter().collect();
        let mut documents = [document];
        self.populate(&mut documents, &relations).await?;
        E::from_document(&DocumentReader::new(&documents[0]))
    }
}

#[async_trait]
impl<E: DocumentMapper> DataAccess<E> for MongoDataAccess<E> {
    async fn create(&self, input: E::Create) -> Result<E, DataError> {
        let id = uuid::Uuid::new_v4().to_string();
        let stamp = Value::Timestamp(now());

        let mut values = vec![
            ("id", Value::Text(id.clone())),
            ("createdAt", stamp.clone()),
            ("updatedAt", stamp),
        ];
        values.extend(E::create_values(&input));
        let document = document_of::<E>(values)?;

        self.store.insert(E::collection_name(), document).await?;
        tracing::debug!(entity = E::name(), id = %id, "document inserted");

        let stored = self
            .store
            .find_one(E::collection_name(), by_id(&id))
            .await?
            .ok_or_else(|| DataError::Other(format!("Error creating {}", E::name().to_lowercase())))?;
        self.finish(stored).await
    }

    async fn read(&self, id: &str) -> Result<E, DataError> {
        let document = self
            .store
            .find_one(E::collection_name(), by_id(id))
            .await?
            .ok_or_else(|| DataError::not_found(E::name(), id))?;
        self.finish(document).await
    }

    async fn read_all(&self, spec: Option<&SearchSpec<E>>) -> Result<SearchResult<E>, DataError> {
        let plan = QueryPlan::resolve(spec)?;
        let query = compile_search::<E>(&plan);
        tracing::debug!(entity = E::name(), filter = %query.filter, "compiled search");

        let started = Instant::now();
        let total = self
            .store
            .count(E::collection_name(), query.filter.clone())
            .await?;
        let mut documents = self.store.find(E::collection_name(), query).await?;
        self.populate(&mut documents, &plan.populate).await?;

        let items = documents
            .iter()
            .map(|d| E::from_document(&DocumentReader::new(d)))
            .collect::<Result<Vec<_>, _>>()?;
        let metadata = SearchMetadata::new(total, plan.pagination, started.elapsed());
        Ok(SearchResult::new(items, metadata))
    }

    async fn update(&self, id: &str, input: E::Update) -> Result<E, DataError> {
        let mut values = E::update_values(&input);
        values.push(("updatedAt", Value::Timestamp(now())));
        let set = document_of::<E>(values)?;

        let document = self
            .store
            .update_one(E::collection_name(), by_id(id), set)
            .await?
            .ok_or_else(|| DataError::not_found(E::name(), id))?;
        self.finish(document).await
    }

    async fn delete(&self, id: &str) -> Result<E, DataError> {
        let document = self
            .store
            .delete_one(E::collection_name(), by_id(id))
            .await?
            .ok_or_else(|| DataError::not_found(E::name(), id))?;
        self.finish(document).await
    }
}
