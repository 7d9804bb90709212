//! Construction of scalar representations during a rebuild.
//!
//! Every representation starts from a snapshot of the parent's current state
//! (cursor, time point, viewports, mapping, ...) so that views created after
//! a mutation agree with views created before it. After construction they
//! are only touched through the parent's propagation methods.
use super::representation::{materialize, RepresentationSource, ScalarRepresentation};
use super::state::WrapperState;
use crate::error::WrapperError;
use crate::events::ChangeBroadcaster;
use crate::geometry::{ReferenceSpace, SpatialTransform};
use crate::image::{ComponentValue, VectorImage};
use crate::reduction::Reduction;
use crate::types::{ScalarRepKey, WrapperId};
use log::debug;

/// Parent-side inputs shared by every representation built in one rebuild.
pub(crate) struct ParentLink<'a> {
    pub id: WrapperId,
    pub state: &'a WrapperState,
    pub events: &'a ChangeBroadcaster,
}

fn initial_state<T: ComponentValue>(
    parent: &ParentLink<'_>,
    image: &VectorImage<T>,
    reference_space: &ReferenceSpace,
    transform: &SpatialTransform,
) -> Result<WrapperState, WrapperError> {
    reference_space
        .validate()
        .map_err(WrapperError::InvalidReferenceSpace)?;
    let mut state = parent.state.clone();
    state.image_geometry = image.geometry().clone();
    state.reference_space = reference_space.clone();
    state.transform = transform.clone();
    Ok(state)
}

/// Zero-copy view of component `index`.
pub(crate) fn create_component_wrapper<T: ComponentValue>(
    parent: &ParentLink<'_>,
    image: &VectorImage<T>,
    index: usize,
    reference_space: &ReferenceSpace,
    transform: &SpatialTransform,
) -> Result<ScalarRepresentation<T>, WrapperError> {
    let key = ScalarRepKey::component(index);
    if index >= image.components() {
        return Err(WrapperError::UnknownRepresentation(key));
    }
    let state = initial_state(parent, image, reference_space, transform)?;
    Ok(ScalarRepresentation::new(
        key,
        parent.id,
        image.layout(),
        RepresentationSource::Component {
            buffer: image.buffer().clone(),
            index,
        },
        state,
        parent.events.forwarder(key),
    ))
}

/// View computed by applying `reduction` to every voxel.
pub(crate) fn create_derived_wrapper<T: ComponentValue>(
    parent: &ParentLink<'_>,
    image: &VectorImage<T>,
    reduction: Reduction,
    reference_space: &ReferenceSpace,
    transform: &SpatialTransform,
) -> Result<ScalarRepresentation<T>, WrapperError> {
    let key = ScalarRepKey::derived(reduction.kind());
    let state = initial_state(parent, image, reference_space, transform)?;
    let values = materialize(
        image.buffer(),
        image.components(),
        reduction,
        state.native_mapping,
    );
    debug!(
        "materialized {key} over {} voxels ({} components)",
        values.len(),
        image.components()
    );
    Ok(ScalarRepresentation::new(
        key,
        parent.id,
        image.layout(),
        RepresentationSource::Derived {
            reduction,
            source: image.buffer().clone(),
            values,
        },
        state,
        parent.events.forwarder(key),
    ))
}
