//! # Joint Reactions
//!
//! Reaction forces and moments of kinematic joints solved as MPC184
//! elements.
//!
//! MPC184 reports constraint forces through two SMISC channel groups: the
//! direct constraint force/moment (items 1..=6) and the joint element force
//! (items 43..=48, the direct item + 42). For a degree of freedom the joint
//! leaves free, the direct channel carries no meaningful value and the joint
//! element force is reported instead. Every value is negated to express it
//! as the reaction acting on the joint.
//!
//! | Rotations | MX        | MY        | MZ        |
//! |-----------|-----------|-----------|-----------|
//! | FreeAll   | alternate | alternate | alternate |
//! | FreeX     | alternate | direct    | direct    |
//! | FreeY     | direct    | alternate | direct    |
//! | FreeZ     | direct    | direct    | alternate |
//! | Fixed     | direct    | direct    | direct    |
//!
//! The item numbers are specific to MPC184; other joint element families
//! number their outputs differently.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ChannelReader, PassOutput, SkippedRecord};
use crate::errors::{PostError, PostResult};
use crate::model::{DofState, JointConnection, JointDofs, RotationDofs};
use crate::results::ResultSource;
use crate::time_scoping::TimeScoping;

/// Offset from a direct MPC184 item to its joint element force item
pub const MPC184_ALTERNATE_OFFSET: u32 = 42;

/// Direct MPC184 constraint items FX, FY, FZ, MX, MY, MZ
pub const MPC184_DIRECT_ITEMS: [u32; 6] = [1, 2, 3, 4, 5, 6];

/// Joint reaction component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionComponent {
    Fx,
    Fy,
    Fz,
    Mx,
    My,
    Mz,
}

impl ReactionComponent {
    pub const ALL: [ReactionComponent; 6] = [
        ReactionComponent::Fx,
        ReactionComponent::Fy,
        ReactionComponent::Fz,
        ReactionComponent::Mx,
        ReactionComponent::My,
        ReactionComponent::Mz,
    ];

    /// Direct MPC184 SMISC item
    pub fn direct_item(self) -> u32 {
        MPC184_DIRECT_ITEMS[self as usize]
    }

    /// Joint element force SMISC item
    pub fn alternate_item(self) -> u32 {
        self.direct_item() + MPC184_ALTERNATE_OFFSET
    }

    pub fn name(self) -> &'static str {
        match self {
            ReactionComponent::Fx => "FX",
            ReactionComponent::Fy => "FY",
            ReactionComponent::Fz => "FZ",
            ReactionComponent::Mx => "MX",
            ReactionComponent::My => "MY",
            ReactionComponent::Mz => "MZ",
        }
    }
}

/// Whether `component` is read from the joint element force channel.
pub fn uses_alternate(dofs: &JointDofs, component: ReactionComponent) -> bool {
    use ReactionComponent::*;
    match component {
        Fx => dofs.translation[0] == DofState::Free,
        Fy => dofs.translation[1] == DofState::Free,
        Fz => dofs.translation[2] == DofState::Free,
        Mx => matches!(dofs.rotations, RotationDofs::FreeAll | RotationDofs::FreeX),
        My => matches!(dofs.rotations, RotationDofs::FreeAll | RotationDofs::FreeY),
        Mz => matches!(dofs.rotations, RotationDofs::FreeAll | RotationDofs::FreeZ),
    }
}

/// SMISC item to read for `component` under the given DOF declaration.
pub fn channel_for(dofs: &JointDofs, component: ReactionComponent) -> u32 {
    if uses_alternate(dofs, component) {
        component.alternate_item()
    } else {
        component.direct_item()
    }
}

/// Raw MPC184 channel values for one joint at one set.
///
/// Index `k` of `direct` is item `k + 1`; index `k` of `alternate` is item
/// `k + 43`. Absent channels are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Mpc184Channels {
    pub direct: [Option<f64>; 6],
    pub alternate: [Option<f64>; 6],
}

impl Mpc184Channels {
    fn get(&self, item: u32) -> Option<f64> {
        match item {
            1..=6 => self.direct[(item - 1) as usize],
            43..=48 => self.alternate[(item - 43) as usize],
            _ => None,
        }
    }
}

/// Reaction forces and moments of a joint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointReaction {
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub mx: f64,
    pub my: f64,
    pub mz: f64,
}

impl JointReaction {
    pub fn forces(&self) -> [f64; 3] {
        [self.fx, self.fy, self.fz]
    }

    pub fn moments(&self) -> [f64; 3] {
        [self.mx, self.my, self.mz]
    }
}

/// Select the channel of each component and negate it.
///
/// # Errors
///
/// [`PostError::MissingField`] naming the SMISC item when a selected channel
/// is absent.
///
/// # Example
///
/// ```rust
/// use post_core::calculations::joint_reaction::{resolve_reaction, Mpc184Channels};
/// use post_core::model::{DofState, JointDofs, RotationDofs};
///
/// let dofs = JointDofs {
///     translation: [DofState::Fixed; 3],
///     rotations: RotationDofs::FreeZ,
/// };
/// let channels = Mpc184Channels {
///     direct: [Some(10.0), Some(20.0), Some(30.0), Some(1.0), Some(2.0), Some(3.0)],
///     alternate: [Some(0.0), Some(0.0), Some(0.0), Some(0.0), Some(0.0), Some(0.5)],
/// };
/// let reaction = resolve_reaction(&dofs, &channels).unwrap();
/// assert_eq!(reaction.fx, -10.0);
/// assert_eq!(reaction.mz, -0.5);
/// ```
pub fn resolve_reaction(dofs: &JointDofs, channels: &Mpc184Channels) -> PostResult<JointReaction> {
    let mut values = [0.0; 6];
    for (slot, component) in values.iter_mut().zip(ReactionComponent::ALL) {
        let item = channel_for(dofs, component);
        let raw = channels.get(item).ok_or_else(|| {
            PostError::missing_field(
                format!("SMISC {}", item),
                format!("joint reaction {}", component.name()),
            )
        })?;
        *slot = -raw;
    }
    Ok(JointReaction {
        fx: values[0],
        fy: values[1],
        fz: values[2],
        mx: values[3],
        my: values[4],
        mz: values[5],
    })
}

/// A joint reaction tagged with its joint and result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointReactionRecord {
    pub connection_id: u32,
    pub name: String,
    pub joint_type: String,
    pub element_id: u32,
    pub set: usize,
    pub time: f64,
    pub reaction: JointReaction,
}

/// Reactions of every solved joint at every scoped set.
///
/// Joints with element id 0 were not sent to the solver and are ignored.
/// Records are ordered by element id, then set.
pub fn joint_reactions<S>(
    source: &S,
    joints: &[JointConnection],
    scoping: &TimeScoping,
) -> PostResult<PassOutput<JointReactionRecord>>
where
    S: ResultSource + ?Sized,
{
    let mut solved: Vec<&JointConnection> = joints.iter().filter(|j| j.element_id != 0).collect();
    solved.sort_by_key(|j| j.element_id);
    let element_ids: Vec<u32> = solved.iter().map(|j| j.element_id).collect();

    let items: Vec<u32> = ReactionComponent::ALL
        .iter()
        .flat_map(|c| [c.direct_item(), c.alternate_item()])
        .collect();
    let reader = ChannelReader::read(source, &items, scoping, &element_ids)?;

    let mut output = PassOutput::default();
    for joint in solved {
        for sample in &scoping.samples {
            let mut channels = Mpc184Channels::default();
            for (k, component) in ReactionComponent::ALL.iter().enumerate() {
                channels.direct[k] = reader.optional(component.direct_item(), sample.set, joint.element_id);
                channels.alternate[k] =
                    reader.optional(component.alternate_item(), sample.set, joint.element_id);
            }
            match resolve_reaction(&joint.dofs, &channels) {
                Ok(reaction) => output.records.push(JointReactionRecord {
                    connection_id: joint.id,
                    name: joint.name.clone(),
                    joint_type: joint.joint_type.clone(),
                    element_id: joint.element_id,
                    set: sample.set,
                    time: sample.time,
                    reaction,
                }),
                Err(e) => output
                    .skipped
                    .push(SkippedRecord::new(joint.element_id, &joint.name, Some(sample.set), e)),
            }
        }
    }

    info!(
        joints = joints.len(),
        solved = element_ids.len(),
        records = output.records.len(),
        "computed joint reactions"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> Mpc184Channels {
        Mpc184Channels {
            direct: [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.0)],
            alternate: [Some(43.0), Some(44.0), Some(45.0), Some(46.0), Some(47.0), Some(48.0)],
        }
    }

    fn dofs(translation: [DofState; 3], rotations: RotationDofs) -> JointDofs {
        JointDofs { translation, rotations }
    }

    #[test]
    fn test_channel_numbers() {
        assert_eq!(ReactionComponent::Fx.direct_item(), 1);
        assert_eq!(ReactionComponent::Mz.direct_item(), 6);
        assert_eq!(ReactionComponent::Fx.alternate_item(), 43);
        assert_eq!(ReactionComponent::Mz.alternate_item(), 48);
    }

    #[test]
    fn test_rotation_cases() {
        let fixed = [DofState::Fixed; 3];
        let cases = [
            (RotationDofs::FreeAll, [-46.0, -47.0, -48.0]),
            (RotationDofs::FreeX, [-46.0, -5.0, -6.0]),
            (RotationDofs::FreeY, [-4.0, -47.0, -6.0]),
            (RotationDofs::FreeZ, [-4.0, -5.0, -48.0]),
            (RotationDofs::Fixed, [-4.0, -5.0, -6.0]),
        ];
        for (rotations, expected) in cases {
            let reaction = resolve_reaction(&dofs(fixed, rotations), &channels()).unwrap();
            assert_eq!(reaction.moments(), expected, "{:?}", rotations);
            assert_eq!(reaction.forces(), [-1.0, -2.0, -3.0]);
        }
    }

    #[test]
    fn test_free_translation_uses_alternate() {
        let d = dofs([DofState::Free, DofState::Fixed, DofState::Free], RotationDofs::Fixed);
        let reaction = resolve_reaction(&d, &channels()).unwrap();
        assert_eq!(reaction.forces(), [-43.0, -2.0, -45.0]);
    }

    #[test]
    fn test_missing_selected_channel() {
        let mut raw = channels();
        raw.alternate[5] = None;
        // MZ direct channel is selected, so the missing alternate does not matter
        assert!(resolve_reaction(&dofs([DofState::Fixed; 3], RotationDofs::Fixed), &raw).is_ok());

        let err = resolve_reaction(&dofs([DofState::Fixed; 3], RotationDofs::FreeZ), &raw).unwrap_err();
        match err {
            PostError::MissingField { field, .. } => assert_eq!(field, "SMISC 48"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
