//! S3-compatible backend built on `aws-sdk-s3`.
//!
//! Credentials, region, endpoint, and bucket are fixed at construction.
//! Path-style addressing is forced so MinIO and similar stores work without
//! wildcard DNS.

use std::io;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream as S3Body;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use futures_util::stream;
use snapferry_config::StoreSettings;
use snapferry_core::{ByteStream, TransferError, TransferResult};

use crate::backend::{MultipartBackend, PartReceipt};

const CREDENTIALS_PROVIDER: &str = "snapferry-config";

/// Backend talking to one bucket of an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    /// Build a client from static credentials.
    #[must_use]
    pub fn new(settings: &StoreSettings) -> Self {
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.expose(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .endpoint_url(settings.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        Self {
            client: Client::from_conf(config),
            bucket: settings.bucket.clone(),
        }
    }

    /// Bucket every key is stored in.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl MultipartBackend for S3Backend {
    async fn put_object(&self, key: &str, body: Bytes) -> TransferResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(S3Body::from(body))
            .send()
            .await
            .map_err(|err| TransferError::store("put_object", key, err))?;
        Ok(())
    }

    async fn create_upload(&self, key: &str) -> TransferResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| TransferError::store("create_multipart_upload", key, err))?;
        output.upload_id().map(str::to_string).ok_or_else(|| {
            TransferError::store(
                "create_multipart_upload",
                key,
                "store returned no upload id",
            )
        })
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> TransferResult<PartReceipt> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(S3Body::from(body))
            .send()
            .await
            .map_err(|err| TransferError::store("upload_part", key, err))?;
        Ok(PartReceipt {
            part_number,
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn complete_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<PartReceipt>,
    ) -> TransferResult<()> {
        let parts = parts
            .into_iter()
            .map(|receipt| {
                CompletedPart::builder()
                    .part_number(receipt.part_number)
                    .set_e_tag(receipt.etag)
                    .build()
            })
            .collect();
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(|err| TransferError::store("complete_multipart_upload", key, err))?;
        Ok(())
    }

    async fn abort_upload(&self, key: &str, upload_id: &str) -> TransferResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|err| TransferError::store("abort_multipart_upload", key, err))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> TransferResult<ByteStream> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                    || err
                        .raw_response()
                        .is_some_and(|raw| raw.status().as_u16() == 404);
                if missing {
                    return Err(TransferError::NotFound {
                        key: key.to_string(),
                    });
                }
                return Err(TransferError::store("get_object", key, err));
            }
        };
        Ok(Box::pin(stream::unfold(output.body, |mut body| async move {
            body.next()
                .await
                .map(|item| (item.map_err(io::Error::other), body))
        })))
    }
}
