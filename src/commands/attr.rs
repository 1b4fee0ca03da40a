//! `custody attr get|set`.

use anyhow::{bail, Context, Result};
use custody_attest_client::{AttestError, AttributeOptions, AttributeTuple};
use dryoc::types::Bytes;

use crate::{cli::AttrAction, context::AppContext};

pub async fn run(ctx: &AppContext, action: AttrAction) -> Result<()> {
    match action {
        AttrAction::Get { cid, attr, all, encrypted } => get(ctx, &cid, attr.as_deref(), all, encrypted).await,
        AttrAction::Set {
            cid,
            attr,
            str_value,
            json_value,
            encrypted,
            index,
        } => set(ctx, &cid, &attr, str_value, json_value, encrypted, index).await,
    }
}

async fn get(ctx: &AppContext, cid: &str, attr: Option<&str>, all: bool, encrypted: bool) -> Result<()> {
    if all {
        let raw = ctx.attest().get_all_attributes(cid).await?;
        let value: serde_json::Value = custody_codec::from_slice(&raw)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let attr = attr.context("provide an attribute name with --attr, or pass --all")?;

    let enc_key = if encrypted {
        ctx.keystore().get(cid, attr)?.map(hex::encode)
    } else {
        None
    };

    let opts = AttributeOptions {
        enc_key,
        leave_encrypted: false,
        format: None,
    };

    match ctx.attest().get_attribute_raw(cid, attr, &opts).await {
        Ok(raw) => {
            let value: serde_json::Value = custody_codec::from_slice(&raw)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(AttestError::NeedsKey) => {
            bail!("attestation is encrypted, pass --encrypted to use this asset's local key")
        }
        Err(e) => Err(e.into()),
    }
}

async fn set(
    ctx: &AppContext,
    cid: &str,
    attr: &str,
    str_value: Option<String>,
    json_value: Option<String>,
    encrypted: bool,
    index: bool,
) -> Result<()> {
    let (value, type_hint) = match (str_value, json_value) {
        (Some(_), Some(_)) => bail!("only one of --str-value and --json-value may be set"),
        (Some(s), None) => (serde_json::Value::String(s), Some("str".to_string())),
        (None, Some(j)) => (serde_json::from_str(&j).context("--json-value is not valid JSON")?, None),
        (None, None) => bail!("one of --str-value or --json-value must be set"),
    };

    let enc_key = if encrypted {
        let existing = ctx.keystore().get(cid, attr)?;
        let key = match existing {
            Some(bytes) => bytes,
            None => {
                let key = custody_crypt::generate_key();
                ctx.keystore().put(cid, attr, key.as_slice())?;
                key.as_slice().to_vec()
            }
        };
        Some(hex::encode(key))
    } else {
        None
    };

    ctx.attest()
        .set_attestations(
            cid,
            &[AttributeTuple {
                key: attr.to_string(),
                value,
                type_hint,
                enc_key,
            }],
            index,
        )
        .await?;

    Ok(())
}
