use ::common::{Descriptor, Digest};
use registry::blob::{AttachToProject, BlobQuery, BlobSelector, ProjectRef};
use registry::entity::{artifact_blob, blob, project_blob};
use registry::error::AppError;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::common::{PROJECT, TestApp, digest_of};

fn reference(content: &str, media_type: &str, size: i64) -> Descriptor {
    Descriptor::new(media_type, Digest::compute(content.as_bytes()), size)
}

async fn blob_rows(app: &TestApp, digest: &str) -> u64 {
    blob::Entity::find()
        .filter(blob::Column::Digest.eq(digest))
        .count(&app.db)
        .await
        .unwrap()
}

mod ensure {
    use super::*;

    #[tokio::test]
    async fn creates_then_returns_existing_id() {
        let app = TestApp::spawn().await;
        let d = digest_of("layer-a");

        let first = app.blobs().ensure(&d, "application/octet-stream", 10).await.unwrap();
        let second = app.blobs().ensure(&d, "text/plain", 99).await.unwrap();

        assert_eq!(first, second);
        let stored = app.blobs().get(&BlobQuery::new(&d)).await.unwrap();
        assert_eq!(stored.content_type, "application/octet-stream");
        assert_eq!(stored.size, 10);
    }

    #[tokio::test]
    async fn concurrent_calls_converge_on_one_row() {
        let app = TestApp::spawn().await;
        let d = digest_of("layer-race");

        let (a, b) = tokio::join!(
            app.blobs().ensure(&d, "application/octet-stream", 1),
            app.blobs().ensure(&d, "application/octet-stream", 1),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(blob_rows(&app, &d).await, 1);
    }

    #[tokio::test]
    async fn many_concurrent_calls_converge() {
        let app = TestApp::spawn().await;
        let d = digest_of("layer-stampede");

        let ids = futures::future::join_all(
            (0..8).map(|_| app.blobs().ensure(&d, "application/octet-stream", 3)),
        )
        .await;

        let ids: Vec<i64> = ids.into_iter().map(Result::unwrap).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(blob_rows(&app, &d).await, 1);
    }

    #[tokio::test]
    async fn empty_digest_is_bad_request() {
        let app = TestApp::spawn().await;
        let err = app.blobs().ensure("", "text/plain", 1).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}

mod exist_and_get {
    use super::*;

    #[tokio::test]
    async fn exist_flips_after_ensure() {
        let app = TestApp::spawn().await;
        let d = digest_of("layer-b");

        assert!(!app.blobs().exist(&BlobQuery::new(&d)).await.unwrap());
        app.blobs().ensure(&d, "application/octet-stream", 5).await.unwrap();
        assert!(app.blobs().exist(&BlobQuery::new(&d)).await.unwrap());
    }

    #[tokio::test]
    async fn empty_digest_is_bad_request() {
        let app = TestApp::spawn().await;
        let err = app.blobs().exist(&BlobQuery::new("")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn unknown_digest_is_not_found() {
        let app = TestApp::spawn().await;
        let err = app
            .blobs()
            .get(&BlobQuery::new(digest_of("nope")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn artifact_scope_requires_attachment() {
        let app = TestApp::spawn().await;
        let d = digest_of("layer-c");
        let artifact = digest_of("manifest-c");
        app.blobs().ensure(&d, "application/vnd.oci.image.layer.v1.tar+gzip", 42).await.unwrap();

        let scoped = BlobQuery::new(&d).in_artifact(&artifact);
        assert!(app.blobs().get(&scoped).await.unwrap_err().is_not_found());
        assert!(!app.blobs().exist(&scoped).await.unwrap());

        app.blobs()
            .attach_to_artifact(&artifact, &[d.clone()])
            .await
            .unwrap();

        let found = app.blobs().get(&scoped).await.unwrap();
        assert_eq!(found.content_type, "application/vnd.oci.image.layer.v1.tar+gzip");
        assert_eq!(found.size, 42);
    }

    #[tokio::test]
    async fn project_scope_requires_attachment() {
        let app = TestApp::spawn().await;
        let project_id = app.project_id(PROJECT).await;
        let d = digest_of("layer-d");
        let blob_id = app.blobs().ensure(&d, "application/octet-stream", 1).await.unwrap();

        let scoped = BlobQuery::new(&d).in_project(project_id);
        assert!(!app.blobs().exist(&scoped).await.unwrap());

        app.blobs()
            .attach_to_project(AttachToProject {
                blob: BlobSelector::Id(blob_id),
                project: ProjectRef::Id(project_id),
            })
            .await
            .unwrap();

        assert!(app.blobs().exist(&scoped).await.unwrap());
    }

    #[tokio::test]
    async fn both_scopes_must_hold() {
        let app = TestApp::spawn().await;
        let project_id = app.project_id(PROJECT).await;
        let d = digest_of("layer-e");
        let artifact = digest_of("manifest-e");
        app.blobs().ensure(&d, "application/octet-stream", 1).await.unwrap();
        app.blobs()
            .attach_to_artifact(&artifact, &[d.clone()])
            .await
            .unwrap();

        let scoped = BlobQuery::new(&d)
            .in_project(project_id)
            .in_artifact(&artifact);
        assert!(!app.blobs().exist(&scoped).await.unwrap());

        app.blobs()
            .attach_to_project(AttachToProject {
                blob: BlobSelector::Digest(d.clone()),
                project: ProjectRef::Id(project_id),
            })
            .await
            .unwrap();
        assert!(app.blobs().exist(&scoped).await.unwrap());
    }
}

mod attach_to_artifact {
    use super::*;

    async fn attachment_rows(app: &TestApp, artifact: &str) -> u64 {
        artifact_blob::Entity::find()
            .filter(artifact_blob::Column::ArtifactDigest.eq(artifact))
            .count(&app.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn repeated_attach_does_not_duplicate() {
        let app = TestApp::spawn().await;
        let artifact = digest_of("manifest-f");
        let members: Vec<String> = ["l1", "l2", "l3"].iter().map(|c| digest_of(c)).collect();

        app.blobs().attach_to_artifact(&artifact, &members).await.unwrap();
        app.blobs().attach_to_artifact(&artifact, &members).await.unwrap();

        // three members plus the completion marker
        assert_eq!(attachment_rows(&app, &artifact).await, 4);
    }

    #[tokio::test]
    async fn completion_marker_short_circuits() {
        let app = TestApp::spawn().await;
        let artifact = digest_of("manifest-g");
        let first = digest_of("g1");
        let late = digest_of("g2");

        app.blobs()
            .attach_to_artifact(&artifact, &[first.clone()])
            .await
            .unwrap();
        app.blobs()
            .attach_to_artifact(&artifact, &[first, late.clone()])
            .await
            .unwrap();

        let row = artifact_blob::Entity::find_by_id((artifact.clone(), late))
            .one(&app.db)
            .await
            .unwrap();
        assert!(row.is_none());
        assert_eq!(attachment_rows(&app, &artifact).await, 2);
    }

    #[tokio::test]
    async fn missing_marker_reattaches_everything() {
        let app = TestApp::spawn().await;
        let artifact = digest_of("manifest-h");
        let members: Vec<String> = ["h1", "h2"].iter().map(|c| digest_of(c)).collect();

        // simulate a run that stopped after the first member
        registry::blob::store::BlobStore::new(&app.db)
            .attach_to_artifact(&artifact, &members[0])
            .await
            .unwrap();

        app.blobs().attach_to_artifact(&artifact, &members).await.unwrap();

        assert_eq!(attachment_rows(&app, &artifact).await, 3);
        assert!(
            app.blobs()
                .exist(&BlobQuery::new(&members[1]).in_artifact(&artifact))
                .await
                .unwrap()
        );
    }
}

mod attach_to_project {
    use super::*;

    #[tokio::test]
    async fn by_digest_resolves_blob() {
        let app = TestApp::spawn().await;
        let project_id = app.project_id(PROJECT).await;
        let d = digest_of("layer-i");
        let blob_id = app.blobs().ensure(&d, "application/octet-stream", 1).await.unwrap();

        app.blobs()
            .attach_to_project(AttachToProject {
                blob: BlobSelector::Digest(d),
                project: ProjectRef::Id(project_id),
            })
            .await
            .unwrap();

        let row = project_blob::Entity::find_by_id((blob_id, project_id))
            .one(&app.db)
            .await
            .unwrap();
        assert!(row.is_some());
    }

    #[tokio::test]
    async fn unknown_digest_is_not_found() {
        let app = TestApp::spawn().await;
        let err = app
            .blobs()
            .attach_to_project(AttachToProject {
                blob: BlobSelector::Digest(digest_of("ghost")),
                project: ProjectRef::Id(1),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn by_repository_name_resolves_project() {
        let app = TestApp::spawn().await;
        let project_id = app.project_id(PROJECT).await;
        let d = digest_of("layer-j");
        app.blobs().ensure(&d, "application/octet-stream", 1).await.unwrap();

        let params = AttachToProject {
            blob: BlobSelector::Digest(d.clone()),
            project: ProjectRef::Name(format!("{PROJECT}/nginx")),
        };
        app.blobs().attach_to_project(params.clone()).await.unwrap();
        app.blobs().attach_to_project(params).await.unwrap();

        assert!(
            app.blobs()
                .exist(&BlobQuery::new(&d).in_project(project_id))
                .await
                .unwrap()
        );
        let rows = project_blob::Entity::find()
            .filter(project_blob::Column::ProjectId.eq(project_id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let app = TestApp::spawn().await;
        let d = digest_of("layer-k");
        app.blobs().ensure(&d, "application/octet-stream", 1).await.unwrap();

        let err = app
            .blobs()
            .attach_to_project(AttachToProject {
                blob: BlobSelector::Digest(d),
                project: ProjectRef::Name("nowhere/app".into()),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn empty_project_name_is_bad_request() {
        let app = TestApp::spawn().await;
        let d = digest_of("layer-l");
        app.blobs().ensure(&d, "application/octet-stream", 1).await.unwrap();

        let err = app
            .blobs()
            .attach_to_project(AttachToProject {
                blob: BlobSelector::Digest(d),
                project: ProjectRef::Name(String::new()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}

mod sync {
    use super::*;

    #[tokio::test]
    async fn empty_reference_list_is_noop() {
        let app = TestApp::spawn().await;
        app.blobs().sync(&[]).await.unwrap();
        assert_eq!(blob::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn creates_missing_blobs() {
        let app = TestApp::spawn().await;
        let refs = vec![
            reference("s1", "m1", 10),
            reference("s2", "m2", 20),
        ];

        app.blobs().sync(&refs).await.unwrap();

        let stored = app
            .blobs()
            .get(&BlobQuery::new(digest_of("s2")))
            .await
            .unwrap();
        assert_eq!(stored.content_type, "m2");
        assert_eq!(stored.size, 20);
        assert_eq!(blob::Entity::find().count(&app.db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn corrects_content_type() {
        let app = TestApp::spawn().await;

        app.blobs().sync(&[reference("s3", "m1", 10)]).await.unwrap();
        app.blobs().sync(&[reference("s3", "m2", 10)]).await.unwrap();

        let d = digest_of("s3");
        assert_eq!(blob_rows(&app, &d).await, 1);
        let stored = app.blobs().get(&BlobQuery::new(&d)).await.unwrap();
        assert_eq!(stored.content_type, "m2");
    }

    #[tokio::test]
    async fn duplicate_references_create_one_row() {
        let app = TestApp::spawn().await;
        let refs = vec![reference("s4", "m1", 10), reference("s4", "m1", 10)];

        app.blobs().sync(&refs).await.unwrap();

        assert_eq!(blob_rows(&app, &digest_of("s4")).await, 1);
    }

    #[tokio::test]
    async fn mixes_updates_and_creates() {
        let app = TestApp::spawn().await;
        app.blobs()
            .ensure(&digest_of("s5"), "application/octet-stream", 7)
            .await
            .unwrap();

        let refs = vec![reference("s5", "m-layer", 7), reference("s6", "m-config", 3)];
        app.blobs().sync(&refs).await.unwrap();

        let updated = app.blobs().get(&BlobQuery::new(digest_of("s5"))).await.unwrap();
        assert_eq!(updated.content_type, "m-layer");
        assert_eq!(updated.size, 7);
        assert!(app.blobs().exist(&BlobQuery::new(digest_of("s6"))).await.unwrap());
    }

    const REJECT_POISON: &str =
        "ALTER TABLE blob ADD CONSTRAINT no_poison CHECK (content_type <> 'poison')";

    #[tokio::test]
    async fn failed_update_rolls_back_whole_batch() {
        let app = TestApp::spawn().await;
        for content in ["u1", "u2"] {
            app.blobs()
                .ensure(&digest_of(content), "application/octet-stream", 5)
                .await
                .unwrap();
        }
        app.execute_sql(REJECT_POISON).await;

        let refs = vec![
            reference("u1", "m-new", 5),
            reference("u2", "poison", 5),
            reference("u3", "m-new", 5),
        ];
        let err = app.blobs().sync(&refs).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)), "got {err:?}");

        let first = app.blobs().get(&BlobQuery::new(digest_of("u1"))).await.unwrap();
        assert_eq!(first.content_type, "application/octet-stream");
        let second = app.blobs().get(&BlobQuery::new(digest_of("u2"))).await.unwrap();
        assert_eq!(second.content_type, "application/octet-stream");
        // Creations never start once the update batch fails.
        assert_eq!(blob_rows(&app, &digest_of("u3")).await, 0);
    }

    #[tokio::test]
    async fn failed_create_stops_remaining_creates() {
        let app = TestApp::spawn().await;
        app.execute_sql(REJECT_POISON).await;

        let refs = vec![
            reference("c1", "m-ok", 1),
            reference("c2", "poison", 2),
            reference("c3", "m-ok", 3),
        ];
        let err = app.blobs().sync(&refs).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)), "got {err:?}");

        assert_eq!(blob_rows(&app, &digest_of("c1")).await, 1);
        assert_eq!(blob_rows(&app, &digest_of("c2")).await, 0);
        assert_eq!(blob_rows(&app, &digest_of("c3")).await, 0);
    }
}

mod upload_size {
    use super::*;

    #[tokio::test]
    async fn unset_session_is_not_found() {
        let app = TestApp::spawn().await;
        let err = app.blobs().get_accepted_blob_size("s-missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn set_then_get() {
        let app = TestApp::spawn().await;
        app.blobs().set_accepted_blob_size("s-1", 100).await.unwrap();
        assert_eq!(app.blobs().get_accepted_blob_size("s-1").await.unwrap(), 100);
    }
}
