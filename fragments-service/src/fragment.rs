//! The fragment aggregate.

use std::time::SystemTime;

use bytes::Bytes;
use fragments_types::media::{self, MediaType};
use fragments_types::record::FragmentRecord;
use serde::{Serialize, Serializer};

use crate::convert;
use crate::error::{Error, Result};
use crate::store::{FragmentStore, Listing};

/// Input to [`Fragment::new`].
///
/// Only `owner_id` and `media_type` are required. All other fields are filled in when absent.
#[derive(Clone, Debug, Default)]
pub struct FragmentInit {
    /// Identifier of the owning principal.
    pub owner_id: String,
    /// Declared media type, optionally with parameters.
    pub media_type: String,
    /// An existing id. A random one is generated if `None` or empty.
    pub id: Option<String>,
    /// Creation time, defaults to now.
    pub created: Option<SystemTime>,
    /// Time of the last write, defaults to now.
    pub updated: Option<SystemTime>,
    /// Length of the data in bytes.
    pub size: u64,
}

impl FragmentInit {
    /// Creates the input for a new, empty fragment.
    pub fn new(owner_id: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            media_type: media_type.into(),
            ..Default::default()
        }
    }
}

/// An owner-scoped, typed byte blob.
///
/// A `Fragment` wraps its metadata record together with a handle to the [`FragmentStore`] it is
/// persisted in. The id, owner and media type are fixed at construction. Size and timestamps
/// change through [`save`](Self::save) and [`set_data`](Self::set_data).
///
/// Serializes as its metadata record.
#[derive(Clone, Debug)]
pub struct Fragment {
    record: FragmentRecord,
    media_type: MediaType,
    store: FragmentStore,
}

impl Fragment {
    /// Creates a new fragment, validating the input.
    ///
    /// The fragment is not persisted until [`save`](Self::save) or [`set_data`](Self::set_data)
    /// is called.
    pub fn new(store: &FragmentStore, init: FragmentInit) -> Result<Self> {
        if init.owner_id.is_empty() {
            return Err(Error::Validation("ownerId is required".into()));
        }
        if init.media_type.trim().is_empty() {
            return Err(Error::Validation("type is required".into()));
        }

        let media_type = MediaType::parse(&init.media_type)?;
        if !media_type.is_supported() {
            return Err(Error::UnsupportedType(media_type.to_string()));
        }

        let id = init
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = SystemTime::now();

        let record = FragmentRecord {
            id,
            owner_id: init.owner_id,
            created: init.created.unwrap_or(now),
            updated: init.updated.unwrap_or(now),
            media_type: media_type.as_str().to_owned(),
            size: init.size,
        };

        Ok(Self {
            record,
            media_type,
            store: store.clone(),
        })
    }

    /// Restores a fragment from a persisted record, validating it like [`new`](Self::new).
    pub fn from_record(store: &FragmentStore, record: FragmentRecord) -> Result<Self> {
        Self::new(
            store,
            FragmentInit {
                owner_id: record.owner_id,
                media_type: record.media_type,
                id: Some(record.id),
                created: Some(record.created),
                updated: Some(record.updated),
                size: record.size,
            },
        )
    }

    /// Lists the fragments of an owner.
    ///
    /// Without `expand`, only the ids are returned. With `expand`, every fragment is loaded.
    /// Fragments that are deleted while the listing is in progress are skipped.
    pub async fn by_user(
        store: &FragmentStore,
        owner_id: &str,
        expand: bool,
    ) -> Result<FragmentList> {
        let ids = match store.list_fragments(owner_id, false).await? {
            Listing::Ids(ids) => ids,
            Listing::Records(records) => records.into_iter().map(|record| record.id).collect(),
        };

        if !expand {
            return Ok(FragmentList::Ids(ids));
        }

        let mut fragments = Vec::with_capacity(ids.len());
        for id in ids {
            match store.read_fragment(owner_id, &id).await? {
                Some(record) => fragments.push(Self::from_record(store, record)?),
                None => tracing::debug!(owner_id, id = %id, "skipping vanished fragment"),
            }
        }

        Ok(FragmentList::Fragments(fragments))
    }

    /// Loads a fragment of the owner.
    ///
    /// Returns [`Error::NotFound`] if the owner has no fragment with this id, which includes
    /// fragments of other owners.
    pub async fn by_id(store: &FragmentStore, owner_id: &str, id: &str) -> Result<Self> {
        let record = store
            .read_fragment(owner_id, id)
            .await?
            .ok_or_else(|| Error::NotFound { id: id.to_owned() })?;

        Self::from_record(store, record)
    }

    /// Deletes metadata and data of a fragment. Deleting a missing fragment succeeds.
    pub async fn delete(store: &FragmentStore, owner_id: &str, id: &str) -> Result<()> {
        store.delete_fragment(owner_id, id).await
    }

    /// Refreshes the update time and persists the metadata.
    pub async fn save(&mut self) -> Result<()> {
        self.record.updated = SystemTime::now();
        self.store.write_fragment(&self.record).await
    }

    /// Reads the data of this fragment.
    ///
    /// Returns `None` if no data has been written yet.
    pub async fn get_data(&self) -> Result<Option<Bytes>> {
        self.store
            .read_fragment_data(&self.record.owner_id, &self.record.id)
            .await
    }

    /// Replaces the data of this fragment and persists data and metadata.
    ///
    /// On error, the data may have been written while the metadata still carries the previous
    /// size. See [`FragmentStore::commit`].
    pub async fn set_data(&mut self, data: Bytes) -> Result<()> {
        self.record.size = data.len() as u64;
        self.record.updated = SystemTime::now();
        self.store.commit(&self.record, data).await
    }

    /// Converts `data` from this fragment's type into `target`.
    ///
    /// `target` may carry parameters, only its base type is considered. Fails with
    /// [`Error::ConversionUnsupported`] if the target is not one of [`formats`](Self::formats) or
    /// there is no conversion implemented for the pair.
    pub fn convert_data(&self, data: Bytes, target: &str) -> Result<Bytes> {
        let unsupported = || Error::ConversionUnsupported {
            from: self.mime_type().to_owned(),
            to: target.to_owned(),
        };

        let target = MediaType::parse(target).map_err(|_| unsupported())?;
        if !self.formats().contains(&target.base_type()) {
            return Err(unsupported());
        }

        convert::convert(data, self.mime_type(), target.base_type())
    }

    /// The id of this fragment.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The owner of this fragment.
    pub fn owner_id(&self) -> &str {
        &self.record.owner_id
    }

    /// The declared media type, including parameters.
    pub fn content_type(&self) -> &str {
        self.media_type.as_str()
    }

    /// Time of creation.
    pub fn created(&self) -> SystemTime {
        self.record.created
    }

    /// Time of the last metadata or data write.
    pub fn updated(&self) -> SystemTime {
        self.record.updated
    }

    /// Length of the data in bytes.
    pub fn size(&self) -> u64 {
        self.record.size
    }

    /// The metadata record of this fragment.
    pub fn record(&self) -> &FragmentRecord {
        &self.record
    }

    /// The parsed media type.
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// The base type, i.e. the media type without parameters.
    pub fn mime_type(&self) -> &str {
        self.media_type.base_type()
    }

    /// Returns `true` for `text/*` fragments.
    pub fn is_text(&self) -> bool {
        self.media_type.is_text()
    }

    /// The base types this fragment can be represented as, including its own.
    pub fn formats(&self) -> Vec<&str> {
        media::conversions_for(self.mime_type())
    }

    /// See [`media::is_supported_type`].
    pub fn is_supported_type(raw: &str) -> bool {
        media::is_supported_type(raw)
    }

    /// See [`media::is_valid_extension`].
    pub fn is_valid_extension(ext: &str) -> bool {
        media::is_valid_extension(ext)
    }

    /// See [`media::mime_type_for_extension`].
    pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
        media::mime_type_for_extension(ext)
    }
}

impl Serialize for Fragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

/// Result of [`Fragment::by_user`].
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FragmentList {
    /// Only the ids of the fragments.
    Ids(Vec<String>),
    /// The loaded fragments.
    Fragments(Vec<Fragment>),
}

impl FragmentList {
    /// Returns the number of listed fragments.
    pub fn len(&self) -> usize {
        match self {
            FragmentList::Ids(ids) => ids.len(),
            FragmentList::Fragments(fragments) => fragments.len(),
        }
    }

    /// Returns `true` if no fragments are listed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fragments_types::media::{TEXT_HTML, TEXT_MARKDOWN, TEXT_PLAIN};

    use super::*;
    use crate::backend::{Backend, BackendResult, InMemoryBackend};
    use crate::store::StorageConfig;

    async fn make_store() -> FragmentStore {
        FragmentStore::new(StorageConfig::Memory).await.unwrap()
    }

    async fn make_fragment(
        store: &FragmentStore,
        owner_id: &str,
        ty: &str,
        data: &'static [u8],
    ) -> Fragment {
        let mut fragment = Fragment::new(store, FragmentInit::new(owner_id, ty)).unwrap();
        fragment.save().await.unwrap();
        fragment.set_data(Bytes::from_static(data)).await.unwrap();
        fragment
    }

    #[tokio::test]
    async fn rejects_invalid_input() {
        let store = make_store().await;

        let err = Fragment::new(&store, FragmentInit::new("", TEXT_PLAIN)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");

        let err = Fragment::new(&store, FragmentInit::new("owner", "")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");

        let err = Fragment::new(&store, FragmentInit::new("owner", "not a type")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");

        let err = Fragment::new(&store, FragmentInit::new("owner", "image/png")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(ref ty) if ty == "image/png"), "{err}");
    }

    #[tokio::test]
    async fn fills_defaults() {
        let store = make_store().await;

        let fragment =
            Fragment::new(&store, FragmentInit::new("owner", "text/plain; charset=utf-8")).unwrap();
        assert!(!fragment.id().is_empty());
        assert_eq!(fragment.owner_id(), "owner");
        assert_eq!(fragment.content_type(), "text/plain; charset=utf-8");
        assert_eq!(fragment.size(), 0);
        assert_eq!(fragment.created(), fragment.updated());

        let other = Fragment::new(&store, FragmentInit::new("owner", TEXT_PLAIN)).unwrap();
        assert_ne!(fragment.id(), other.id());

        let init = FragmentInit {
            id: Some(String::new()),
            ..FragmentInit::new("owner", TEXT_PLAIN)
        };
        assert!(!Fragment::new(&store, init).unwrap().id().is_empty());
    }

    #[tokio::test]
    async fn keeps_given_fields() {
        let store = make_store().await;
        let created = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        let init = FragmentInit {
            id: Some("abc".into()),
            created: Some(created),
            updated: Some(created),
            size: 42,
            ..FragmentInit::new("owner", TEXT_MARKDOWN)
        };
        let fragment = Fragment::new(&store, init).unwrap();

        assert_eq!(fragment.id(), "abc");
        assert_eq!(fragment.created(), created);
        assert_eq!(fragment.updated(), created);
        assert_eq!(fragment.size(), 42);
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = make_store().await;

        let init = FragmentInit::new("owner", TEXT_MARKDOWN);
        let mut fragment = Fragment::new(&store, init).unwrap();
        fragment.save().await.unwrap();

        let loaded = Fragment::by_id(&store, "owner", fragment.id()).await.unwrap();
        let expected = FragmentRecord {
            updated: loaded.updated(),
            ..fragment.record().clone()
        };
        assert_eq!(loaded.record(), &expected);
        assert!(loaded.updated() >= loaded.created());
    }

    #[tokio::test]
    async fn set_data_round_trip() {
        let store = make_store().await;

        let mut fragment = Fragment::new(&store, FragmentInit::new("owner", TEXT_PLAIN)).unwrap();
        fragment.save().await.unwrap();
        // Metadata without data reads as no data.
        assert_eq!(fragment.get_data().await.unwrap(), None);

        for data in [&b"hello world"[..], b"", b"\x00\xff\xfe"] {
            fragment.set_data(Bytes::from_static(data)).await.unwrap();
            assert_eq!(fragment.size(), data.len() as u64);
            assert_eq!(fragment.get_data().await.unwrap().as_deref(), Some(data));

            let loaded = Fragment::by_id(&store, "owner", fragment.id()).await.unwrap();
            assert_eq!(loaded.size(), data.len() as u64);
            assert_eq!(loaded.get_data().await.unwrap().as_deref(), Some(data));
        }
    }

    #[tokio::test]
    async fn delete_then_load() {
        let store = make_store().await;
        let fragment = make_fragment(&store, "owner", TEXT_PLAIN, b"data").await;

        Fragment::delete(&store, "owner", fragment.id()).await.unwrap();
        let err = Fragment::by_id(&store, "owner", fragment.id()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref id } if id == fragment.id()));
        assert_eq!(fragment.get_data().await.unwrap(), None);

        // Deleting again is fine.
        Fragment::delete(&store, "owner", fragment.id()).await.unwrap();
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let store = make_store().await;
        let fragment = make_fragment(&store, "alice", TEXT_PLAIN, b"secret").await;

        let err = Fragment::by_id(&store, "bob", fragment.id()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(Fragment::by_user(&store, "bob", true).await.unwrap().is_empty());

        // Same id under another owner does not touch alice's fragment.
        let init = FragmentInit {
            id: Some(fragment.id().to_owned()),
            ..FragmentInit::new("bob", TEXT_PLAIN)
        };
        let mut other = Fragment::new(&store, init).unwrap();
        other.set_data(Bytes::from_static(b"public")).await.unwrap();
        Fragment::delete(&store, "bob", fragment.id()).await.unwrap();

        let loaded = Fragment::by_id(&store, "alice", fragment.id()).await.unwrap();
        assert_eq!(loaded.get_data().await.unwrap().as_deref(), Some(&b"secret"[..]));
    }

    #[tokio::test]
    async fn list_empty_owner() {
        let store = make_store().await;

        let list = Fragment::by_user(&store, "nobody", false).await.unwrap();
        assert!(matches!(list, FragmentList::Ids(ref ids) if ids.is_empty()));
        let list = Fragment::by_user(&store, "nobody", true).await.unwrap();
        assert!(matches!(list, FragmentList::Fragments(ref fragments) if fragments.is_empty()));
    }

    #[tokio::test]
    async fn list_expanded() {
        let store = make_store().await;
        let first = make_fragment(&store, "owner", TEXT_PLAIN, b"1").await;
        let second = make_fragment(&store, "owner", TEXT_HTML, b"<b>2</b>").await;

        let FragmentList::Ids(ids) = Fragment::by_user(&store, "owner", false).await.unwrap() else {
            panic!("expected ids");
        };
        assert_eq!(ids, [first.id(), second.id()]);

        let list = Fragment::by_user(&store, "owner", true).await.unwrap();
        let FragmentList::Fragments(fragments) = list else {
            panic!("expected fragments");
        };
        let records: Vec<_> = fragments.iter().map(Fragment::record).collect();
        assert_eq!(records, [first.record(), second.record()]);

        let json = serde_json::to_value(&fragments[1]).unwrap();
        assert_eq!(json["type"], TEXT_HTML);
        assert_eq!(json["size"], 8);
    }

    /// Lists a fragment that is gone by the time it is read.
    #[derive(Debug)]
    struct VanishingBackend(InMemoryBackend);

    #[async_trait::async_trait]
    impl Backend for VanishingBackend {
        fn name(&self) -> &'static str {
            "vanishing"
        }

        async fn write_fragment(&self, record: &FragmentRecord) -> BackendResult<()> {
            self.0.write_fragment(record).await
        }

        async fn read_fragment(
            &self,
            owner_id: &str,
            id: &str,
        ) -> BackendResult<Option<FragmentRecord>> {
            self.0.read_fragment(owner_id, id).await
        }

        async fn write_fragment_data(
            &self,
            owner_id: &str,
            id: &str,
            data: Bytes,
        ) -> BackendResult<()> {
            self.0.write_fragment_data(owner_id, id, data).await
        }

        async fn read_fragment_data(
            &self,
            owner_id: &str,
            id: &str,
        ) -> BackendResult<Option<Bytes>> {
            self.0.read_fragment_data(owner_id, id).await
        }

        async fn list_fragments(&self, owner_id: &str) -> BackendResult<Vec<FragmentRecord>> {
            let mut records = self.0.list_fragments(owner_id).await?;
            let now = SystemTime::now();
            records.insert(
                0,
                FragmentRecord {
                    id: "vanished".into(),
                    owner_id: owner_id.into(),
                    created: now,
                    updated: now,
                    media_type: TEXT_PLAIN.into(),
                    size: 0,
                },
            );
            Ok(records)
        }

        async fn delete_fragment(&self, owner_id: &str, id: &str) -> BackendResult<()> {
            self.0.delete_fragment(owner_id, id).await
        }
    }

    #[tokio::test]
    async fn list_skips_vanished_fragments() {
        let store = FragmentStore::from_backend(Box::new(VanishingBackend(InMemoryBackend::new())));
        let kept = make_fragment(&store, "owner", TEXT_PLAIN, b"kept").await;

        let ids = Fragment::by_user(&store, "owner", false).await.unwrap();
        assert!(matches!(ids, FragmentList::Ids(ref ids) if ids == &["vanished", kept.id()]));

        let list = Fragment::by_user(&store, "owner", true).await.unwrap();
        let FragmentList::Fragments(fragments) = list else {
            panic!("expected fragments");
        };
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].id(), kept.id());
    }

    #[tokio::test]
    async fn derived_properties() {
        let store = make_store().await;

        let init = FragmentInit::new("owner", "text/markdown; charset=utf-8");
        let markdown = Fragment::new(&store, init).unwrap();
        assert_eq!(markdown.mime_type(), TEXT_MARKDOWN);
        assert!(markdown.is_text());
        assert_eq!(markdown.formats(), [TEXT_MARKDOWN, TEXT_HTML, TEXT_PLAIN]);

        let json = Fragment::new(&store, FragmentInit::new("owner", "application/json")).unwrap();
        assert!(!json.is_text());
        assert_eq!(json.formats(), ["application/json", TEXT_PLAIN]);

        assert!(Fragment::is_supported_type("text/csv"));
        assert!(!Fragment::is_supported_type("image/png"));
        assert!(Fragment::is_valid_extension(".md"));
        assert!(!Fragment::is_valid_extension(".png"));
        assert_eq!(Fragment::mime_type_for_extension(".html"), Some(TEXT_HTML));
        assert_eq!(Fragment::mime_type_for_extension(".exe"), None);
    }

    #[tokio::test]
    async fn convert_markdown() {
        let store = make_store().await;
        let source = b"# Heading\n\n**bold**";
        let fragment = make_fragment(&store, "owner", TEXT_MARKDOWN, source).await;
        let data = fragment.get_data().await.unwrap().unwrap();

        let html = fragment.convert_data(data.clone(), TEXT_HTML).unwrap();
        let html = std::str::from_utf8(&html).unwrap();
        assert!(html.contains("<h1>Heading</h1>"), "{html}");
        assert!(html.contains("<strong>bold</strong>"), "{html}");

        // Parameters on the target are ignored.
        let plain = fragment
            .convert_data(data.clone(), "text/plain; charset=utf-8")
            .unwrap();
        assert_eq!(plain, data);
    }

    #[tokio::test]
    async fn convert_html() {
        let store = make_store().await;
        let fragment = make_fragment(&store, "owner", TEXT_HTML, b"<h1>x</h1>").await;
        let data = fragment.get_data().await.unwrap().unwrap();

        let plain = fragment.convert_data(data, TEXT_PLAIN).unwrap();
        assert_eq!(plain, Bytes::from_static(b"x"));
    }

    #[tokio::test]
    async fn convert_unreachable() {
        let store = make_store().await;
        let fragment = make_fragment(&store, "owner", TEXT_PLAIN, b"plain").await;
        let data = fragment.get_data().await.unwrap().unwrap();

        let err = fragment.convert_data(data.clone(), TEXT_HTML).unwrap_err();
        let Error::ConversionUnsupported { from, to } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!((from.as_str(), to.as_str()), (TEXT_PLAIN, TEXT_HTML));

        let err = fragment.convert_data(data, "garbage").unwrap_err();
        assert!(matches!(err, Error::ConversionUnsupported { .. }), "{err}");
    }
}
