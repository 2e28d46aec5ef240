use crate::error::ServiceError;
use crate::pipeline::customize::Customization;
use crate::pipeline::materialize::NamespaceKind;
use crate::pipeline::{build_client_preview, load_base_files};
use crate::services::AppState;
use common::model::client_preview::{BuildStatus, ClientPreview, Customizations};
use common::model::template::Template;

/// Placeholder keys end up inside `{{...}}`, so they cannot carry braces.
pub(super) fn validate_customizations(customizations: &Customizations) -> Result<(), ServiceError> {
    for key in customizations.extra.keys() {
        if key.trim().is_empty() || key.contains(['{', '}']) {
            return Err(ServiceError::BadRequest(format!(
                "Invalid placeholder key '{}'",
                key
            )));
        }
    }
    Ok(())
}

/// Moves `preview` through `building` to `built` or `failed`, persisting
/// each step.
pub(super) async fn rebuild(
    state: &AppState,
    mut preview: ClientPreview,
    template: &Template,
) -> Result<ClientPreview, ServiceError> {
    let customization = resolve_customization(state, &preview.customizations)?;
    if !state.store.begin_build(&preview.id)? {
        return Err(ServiceError::Conflict(format!(
            "Preview {} is already being built",
            preview.id
        )));
    }

    let layout = state.layout.clone();
    let client_name = preview.client_name.clone();
    let template_name = template.name.clone();
    let record = template.files.clone();
    let main_entry = template.main_entry.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let (_, template_dir) = layout.namespace_dir(NamespaceKind::Templates, &template_name)?;
        let base_files = load_base_files(&template_dir, &record)?;
        build_client_preview(&layout, &client_name, &base_files, &customization, &main_entry)
    })
    .await
    .map_err(ServiceError::from)
    .and_then(|result| result.map_err(ServiceError::from));

    match outcome {
        Ok(materialized) => {
            state.store.set_build_status(
                &preview.id,
                BuildStatus::Built,
                Some(&materialized.preview_url),
                None,
            )?;
            log::info!(
                "Built preview {} for '{}': {} file(s) at {}",
                preview.id,
                preview.client_name,
                materialized.files_written,
                materialized.preview_url
            );
            preview.build_status = BuildStatus::Built;
            preview.build_error = None;
            preview.preview_url = Some(materialized.preview_url);
            Ok(preview)
        }
        Err(e) => {
            state.store.set_build_status(
                &preview.id,
                BuildStatus::Failed,
                None,
                Some(&e.to_string()),
            )?;
            Err(e)
        }
    }
}

fn resolve_customization(
    state: &AppState,
    customizations: &Customizations,
) -> Result<Customization, ServiceError> {
    let logo_url = match customizations.logo.as_deref() {
        Some(media_id) => match state.store.get_media(media_id)? {
            Some(asset) => Some(asset.url()),
            None => {
                log::warn!("Logo media {} not found; keeping template logo", media_id);
                None
            }
        },
        None => None,
    };
    Ok(Customization {
        business_name: Some(customizations.business_name.clone()),
        logo_url,
        substitutions: customizations.extra.clone(),
    })
}
