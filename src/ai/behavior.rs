//! Behavior-tree AI host: XML-flavored tree markup, a factory of named node
//! types, per-tick execution that bridges the `ai_state` blackboard port into
//! an ECS component, and blend timers toward animation.

use crate::ecs::{EntityId, World};
use crate::utils::error::{FabricError, Result};
use log::warn;
use std::collections::HashMap;

/// AI behavioral state for NPC decision-making.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AiState {
    #[default]
    Idle,
    Patrol,
    Chase,
    Attack,
    Flee,
}

impl AiState {
    pub fn from_index(value: i64) -> Self {
        match value {
            1 => AiState::Patrol,
            2 => AiState::Chase,
            3 => AiState::Attack,
            4 => AiState::Flee,
            _ => AiState::Idle,
        }
    }

    pub fn index(self) -> i64 {
        match self {
            AiState::Idle => 0,
            AiState::Patrol => 1,
            AiState::Chase => 2,
            AiState::Attack => 3,
            AiState::Flee => 4,
        }
    }
}

// --- ECS components ---

/// Tag for AI-driven characters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NpcTag;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AiStateComponent {
    pub state: AiState,
}

pub struct BehaviorTreeComponent {
    pub tree: BehaviorTree,
}

/// Which clip plays for each AI state, and how long state changes blend.
#[derive(Debug, Clone, PartialEq)]
pub struct AiAnimationMapping {
    pub idle_clip: String,
    pub patrol_clip: String,
    pub chase_clip: String,
    pub attack_clip: String,
    pub flee_clip: String,
    pub blend_duration: f32,
}

impl Default for AiAnimationMapping {
    fn default() -> Self {
        Self {
            idle_clip: "idle".into(),
            patrol_clip: "walk".into(),
            chase_clip: "run".into(),
            attack_clip: "attack".into(),
            flee_clip: "run_fast".into(),
            blend_duration: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AiAnimationState {
    pub previous_state: AiState,
    pub blend_timer: f32,
    pub blending: bool,
}

// --- Blackboard ---

#[derive(Debug, Clone, PartialEq)]
pub enum BlackboardValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Str(String),
}

#[derive(Debug, Clone, Default)]
pub struct Blackboard {
    values: HashMap<String, BlackboardValue>,
}

impl Blackboard {
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.into(), BlackboardValue::Bool(value));
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.into(), BlackboardValue::Int(value));
    }

    pub fn set_float(&mut self, key: &str, value: f32) {
        self.values.insert(key.into(), BlackboardValue::Float(value));
    }

    pub fn set_str(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.into(), BlackboardValue::Str(value.into()));
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            BlackboardValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            BlackboardValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.values.get(key)? {
            BlackboardValue::Float(v) => Some(*v),
            BlackboardValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }
}

// --- Ports ---

/// An XML attribute is either a `{key}` blackboard remap or a literal.
fn input_float(
    blackboard: &Blackboard,
    attrs: &HashMap<String, String>,
    port: &str,
    default: Option<f32>,
) -> Option<f32> {
    match attrs.get(port) {
        Some(value) => match remap_key(value) {
            Some(key) => blackboard.get_float(key),
            None => value.parse().ok(),
        },
        None => default,
    }
}

fn input_bool(
    blackboard: &Blackboard,
    attrs: &HashMap<String, String>,
    port: &str,
) -> Option<bool> {
    match attrs.get(port) {
        Some(value) => match remap_key(value) {
            Some(key) => blackboard.get_bool(key),
            None => value.parse().ok(),
        },
        None => None,
    }
}

fn output_key<'a>(attrs: &'a HashMap<String, String>, port: &'a str) -> &'a str {
    attrs
        .get(port)
        .and_then(|v| remap_key(v))
        .unwrap_or(port)
}

fn remap_key(value: &str) -> Option<&str> {
    value.strip_prefix('{')?.strip_suffix('}')
}

// --- Nodes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Idle,
    Running,
    Success,
    Failure,
}

impl NodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Idle => "IDLE",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Success => "SUCCESS",
            NodeStatus::Failure => "FAILURE",
        }
    }
}

/// A leaf ticks against the blackboard; composites are built in.
pub trait LeafNode: Send {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus;
}

enum NodeKind {
    Sequence(Vec<BtNode>),
    Fallback(Vec<BtNode>),
    Leaf(Box<dyn LeafNode>),
}

struct BtNode {
    uid: u32,
    kind: NodeKind,
}

impl BtNode {
    fn tick(&mut self, blackboard: &mut Blackboard, statuses: &mut HashMap<u32, NodeStatus>) -> NodeStatus {
        let status = match &mut self.kind {
            NodeKind::Sequence(children) => {
                let mut result = NodeStatus::Success;
                for child in children {
                    match child.tick(blackboard, statuses) {
                        NodeStatus::Success => continue,
                        other => {
                            result = other;
                            break;
                        }
                    }
                }
                result
            }
            NodeKind::Fallback(children) => {
                let mut result = NodeStatus::Failure;
                for child in children {
                    match child.tick(blackboard, statuses) {
                        NodeStatus::Failure => continue,
                        other => {
                            result = other;
                            break;
                        }
                    }
                }
                result
            }
            NodeKind::Leaf(leaf) => leaf.tick(blackboard),
        };
        statuses.insert(self.uid, status);
        status
    }

    fn collect_uids(&self, out: &mut Vec<u32>) {
        out.push(self.uid);
        match &self.kind {
            NodeKind::Sequence(children) | NodeKind::Fallback(children) => {
                for child in children {
                    child.collect_uids(out);
                }
            }
            NodeKind::Leaf(_) => {}
        }
    }
}

/// A parsed tree plus its blackboard and per-node status observer.
pub struct BehaviorTree {
    root: BtNode,
    blackboard: Blackboard,
    statuses: HashMap<u32, NodeStatus>,
    paths: HashMap<u32, String>,
}

impl std::fmt::Debug for BehaviorTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTree").finish_non_exhaustive()
    }
}

impl BehaviorTree {
    pub fn tick_once(&mut self) -> NodeStatus {
        self.root.tick(&mut self.blackboard, &mut self.statuses)
    }

    /// Reset node statuses so the tree re-evaluates from scratch next tick.
    pub fn halt(&mut self) {
        for status in self.statuses.values_mut() {
            *status = NodeStatus::Idle;
        }
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Last observed status per node uid.
    pub fn statistics(&self) -> HashMap<u32, NodeStatus> {
        let mut uids = Vec::new();
        self.root.collect_uids(&mut uids);
        uids.into_iter()
            .map(|uid| (uid, self.statuses.get(&uid).copied().unwrap_or(NodeStatus::Idle)))
            .collect()
    }

    /// Slash-separated path per node uid, rooted at the tree root.
    pub fn uid_to_path(&self) -> &HashMap<u32, String> {
        &self.paths
    }
}

/// One row of the flat, depth-annotated tree listing for debug panels.
#[derive(Debug, Clone, PartialEq)]
pub struct BtNodeInfo {
    pub name: String,
    pub status: &'static str,
    pub depth: usize,
}

/// Flat listing ordered by uid; depth is the number of slashes in the path.
pub fn debug_listing(tree: &BehaviorTree) -> Vec<BtNodeInfo> {
    let stats = tree.statistics();
    let mut uids: Vec<u32> = tree.uid_to_path().keys().copied().collect();
    uids.sort_unstable();

    uids.into_iter()
        .map(|uid| {
            let path = &tree.uid_to_path()[&uid];
            BtNodeInfo {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
                status: stats
                    .get(&uid)
                    .copied()
                    .unwrap_or(NodeStatus::Idle)
                    .as_str(),
                depth: path.matches('/').count(),
            }
        })
        .collect()
}

// --- Built-in leaves ---

struct SetStateAction {
    state: AiState,
    attrs: HashMap<String, String>,
}

impl LeafNode for SetStateAction {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        let key = output_key(&self.attrs, "ai_state").to_string();
        blackboard.set_int(&key, self.state.index());
        NodeStatus::Success
    }
}

struct IsPlayerNearby {
    attrs: HashMap<String, String>,
}

impl LeafNode for IsPlayerNearby {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        let (Some(distance), Some(range)) = (
            input_float(blackboard, &self.attrs, "player_distance", None),
            input_float(blackboard, &self.attrs, "detection_range", Some(10.0)),
        ) else {
            return NodeStatus::Failure;
        };
        if distance <= range {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        }
    }
}

struct IsHealthLow {
    attrs: HashMap<String, String>,
}

impl LeafNode for IsHealthLow {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        let (Some(health), Some(threshold)) = (
            input_float(blackboard, &self.attrs, "health", None),
            input_float(blackboard, &self.attrs, "health_threshold", Some(30.0)),
        ) else {
            return NodeStatus::Failure;
        };
        if health <= threshold {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        }
    }
}

struct HasTarget {
    attrs: HashMap<String, String>,
}

impl LeafNode for HasTarget {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        match input_bool(blackboard, &self.attrs, "has_target") {
            Some(true) => NodeStatus::Success,
            _ => NodeStatus::Failure,
        }
    }
}

struct CanSeeTarget {
    attrs: HashMap<String, String>,
}

impl LeafNode for CanSeeTarget {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        let (Some(distance), Some(angle), Some(range), Some(cone), Some(los)) = (
            input_float(blackboard, &self.attrs, "target_distance", None),
            input_float(blackboard, &self.attrs, "target_angle", None),
            input_float(blackboard, &self.attrs, "sight_range", Some(20.0)),
            input_float(blackboard, &self.attrs, "sight_angle", Some(120.0)),
            input_bool(blackboard, &self.attrs, "has_los"),
        ) else {
            return NodeStatus::Failure;
        };
        if distance <= range && angle.abs() <= cone / 2.0 && los {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        }
    }
}

struct CanHearTarget {
    attrs: HashMap<String, String>,
}

impl LeafNode for CanHearTarget {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        let (Some(distance), Some(range)) = (
            input_float(blackboard, &self.attrs, "target_distance", None),
            input_float(blackboard, &self.attrs, "hearing_range", Some(10.0)),
        ) else {
            return NodeStatus::Failure;
        };
        if distance <= range {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        }
    }
}

// --- Host ---

type LeafFactory = Box<dyn Fn(HashMap<String, String>) -> Box<dyn LeafNode> + Send + Sync>;

/// Registers named node types and manages NPC entities driven by trees.
pub struct BehaviorAi {
    factory: HashMap<String, LeafFactory>,
}

impl Default for BehaviorAi {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorAi {
    pub fn new() -> Self {
        let mut host = Self {
            factory: HashMap::new(),
        };

        host.register_leaf("PatrolAction", |attrs| {
            Box::new(SetStateAction {
                state: AiState::Patrol,
                attrs,
            })
        });
        host.register_leaf("ChaseAction", |attrs| {
            Box::new(SetStateAction {
                state: AiState::Chase,
                attrs,
            })
        });
        host.register_leaf("AttackAction", |attrs| {
            Box::new(SetStateAction {
                state: AiState::Attack,
                attrs,
            })
        });
        host.register_leaf("FleeAction", |attrs| {
            Box::new(SetStateAction {
                state: AiState::Flee,
                attrs,
            })
        });
        host.register_leaf("IsPlayerNearby", |attrs| Box::new(IsPlayerNearby { attrs }));
        host.register_leaf("IsHealthLow", |attrs| Box::new(IsHealthLow { attrs }));
        host.register_leaf("HasTarget", |attrs| Box::new(HasTarget { attrs }));
        host.register_leaf("CanSeeTarget", |attrs| Box::new(CanSeeTarget { attrs }));
        host.register_leaf("CanHearTarget", |attrs| Box::new(CanHearTarget { attrs }));

        host
    }

    pub fn register_leaf<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(HashMap<String, String>) -> Box<dyn LeafNode> + Send + Sync + 'static,
    {
        self.factory.insert(name.to_string(), Box::new(factory));
    }

    pub fn registered_node_count(&self) -> usize {
        self.factory.len()
    }

    pub fn load_tree(&self, markup: &str) -> Result<BehaviorTree> {
        let mut parser = TreeParser::new(markup, &self.factory);
        let root = parser.parse_root()?;
        Ok(BehaviorTree {
            root,
            blackboard: Blackboard::default(),
            statuses: HashMap::new(),
            paths: parser.paths,
        })
    }

    /// Create an NPC entity with the tag, state component, and (when markup
    /// is non-empty) a loaded tree.
    pub fn create_npc(&self, world: &mut World, markup: &str) -> Result<EntityId> {
        let entity = world.create_entity();
        world.set(entity, NpcTag);
        world.set(entity, AiStateComponent::default());
        if !markup.is_empty() {
            let tree = self.load_tree(markup)?;
            world.set(entity, BehaviorTreeComponent { tree });
        }
        Ok(entity)
    }

    pub fn set_animation_mapping(
        world: &mut World,
        npc: EntityId,
        mapping: AiAnimationMapping,
    ) {
        world.set(npc, mapping);
        world.set(npc, AiAnimationState::default());
    }

    pub fn clip_for(mapping: &AiAnimationMapping, state: AiState) -> &str {
        match state {
            AiState::Idle => &mapping.idle_clip,
            AiState::Patrol => &mapping.patrol_clip,
            AiState::Chase => &mapping.chase_clip,
            AiState::Attack => &mapping.attack_clip,
            AiState::Flee => &mapping.flee_clip,
        }
    }

    /// Tick every tree once, bridge `ai_state` into the ECS component, halt
    /// completed trees so they restart next tick, then advance blend timers
    /// for entities with an animation mapping.
    pub fn update(&self, world: &mut World, dt: f32) {
        for entity in world.entities_with2::<BehaviorTreeComponent, AiStateComponent>() {
            let state = {
                let Some(component) = world.get_mut::<BehaviorTreeComponent>(entity) else {
                    continue;
                };
                let status = component.tree.tick_once();
                let state = component
                    .tree
                    .blackboard()
                    .get_int("ai_state")
                    .map(AiState::from_index);
                if matches!(status, NodeStatus::Success | NodeStatus::Failure) {
                    component.tree.halt();
                }
                state
            };

            if let (Some(state), Some(ai)) = (state, world.get_mut::<AiStateComponent>(entity)) {
                ai.state = state;
            }
        }

        for entity in world.entities_with3::<AiStateComponent, AiAnimationMapping, AiAnimationState>()
        {
            let Some(state) = world.get::<AiStateComponent>(entity).map(|c| c.state) else {
                continue;
            };
            let blend_duration = world
                .get::<AiAnimationMapping>(entity)
                .map(|m| m.blend_duration)
                .unwrap_or(0.2);
            let Some(anim) = world.get_mut::<AiAnimationState>(entity) else {
                continue;
            };

            if state != anim.previous_state {
                anim.blending = true;
                anim.blend_timer = 0.0;
                anim.previous_state = state;
            } else if anim.blending {
                anim.blend_timer += dt;
                if anim.blend_timer >= blend_duration {
                    anim.blending = false;
                }
            }
        }
    }
}

// --- Markup parser ---

/// Minimal parser for the XML-flavored tree markup. `root` and
/// `BehaviorTree` elements are transparent wrappers; `Sequence` and
/// `Fallback` are composites; everything else resolves through the factory.
struct TreeParser<'a> {
    text: &'a str,
    pos: usize,
    factory: &'a HashMap<String, LeafFactory>,
    next_uid: u32,
    paths: HashMap<u32, String>,
}

struct Element {
    name: String,
    attrs: HashMap<String, String>,
    self_closing: bool,
}

impl<'a> TreeParser<'a> {
    fn new(text: &'a str, factory: &'a HashMap<String, LeafFactory>) -> Self {
        Self {
            text,
            pos: 0,
            factory,
            next_uid: 1,
            paths: HashMap::new(),
        }
    }

    fn parse_root(&mut self) -> Result<BtNode> {
        let mut roots = self.parse_children("", "")?;
        match roots.len() {
            1 => Ok(roots.remove(0)),
            0 => Err(FabricError::InvalidState("tree markup has no nodes".into())),
            _ => Err(FabricError::InvalidState(
                "tree markup has multiple roots".into(),
            )),
        }
    }

    /// Parse sibling elements until the named closing tag (or end of input
    /// when `closing` is empty).
    fn parse_children(&mut self, closing: &str, path: &str) -> Result<Vec<BtNode>> {
        let mut children = Vec::new();

        loop {
            self.skip_whitespace();
            if self.pos >= self.text.len() {
                if closing.is_empty() {
                    return Ok(children);
                }
                return Err(FabricError::InvalidState(format!(
                    "unclosed element '{}'",
                    closing
                )));
            }

            if self.peek_str("</") {
                let name = self.read_closing_tag()?;
                if name != closing {
                    return Err(FabricError::InvalidState(format!(
                        "mismatched closing tag '{}', expected '{}'",
                        name, closing
                    )));
                }
                return Ok(children);
            }

            let element = self.read_element()?;
            if let Some(node) = self.build_node(element, path)? {
                children.push(node);
            }
        }
    }

    fn build_node(&mut self, element: Element, path: &str) -> Result<Option<BtNode>> {
        let name = element.name.as_str();

        // Transparent wrappers contribute nothing to the tree or paths
        if name == "root" || name == "BehaviorTree" {
            if element.self_closing {
                return Ok(None);
            }
            let mut inner = self.parse_children(name, path)?;
            return match inner.len() {
                0 => Ok(None),
                1 => Ok(Some(inner.remove(0))),
                _ => Err(FabricError::InvalidState(format!(
                    "'{}' must contain a single child",
                    name
                ))),
            };
        }

        let node_path = if path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", path, name)
        };
        let uid = self.next_uid;
        self.next_uid += 1;
        self.paths.insert(uid, node_path.clone());

        if name == "Sequence" || name == "Fallback" {
            let children = if element.self_closing {
                Vec::new()
            } else {
                self.parse_children(name, &node_path)?
            };
            let kind = if name == "Sequence" {
                NodeKind::Sequence(children)
            } else {
                NodeKind::Fallback(children)
            };
            return Ok(Some(BtNode { uid, kind }));
        }

        let Some(factory) = self.factory.get(name) else {
            return Err(FabricError::NotFound(format!(
                "unregistered node type '{}'",
                name
            )));
        };
        if !element.self_closing {
            // Leaves are self-closing in practice; tolerate an explicit close
            let extra = self.parse_children(name, &node_path)?;
            if !extra.is_empty() {
                warn!("leaf node '{}' has children; ignoring them", name);
            }
        }
        Ok(Some(BtNode {
            uid,
            kind: NodeKind::Leaf(factory(element.attrs)),
        }))
    }

    fn read_element(&mut self) -> Result<Element> {
        if !self.peek_str("<") {
            return Err(FabricError::InvalidState(format!(
                "expected '<' at offset {}",
                self.pos
            )));
        }
        self.pos += 1;

        let name = self.read_name();
        if name.is_empty() {
            return Err(FabricError::InvalidState(format!(
                "empty element name at offset {}",
                self.pos
            )));
        }

        let mut attrs = HashMap::new();
        loop {
            self.skip_whitespace();
            if self.peek_str("/>") {
                self.pos += 2;
                return Ok(Element {
                    name,
                    attrs,
                    self_closing: true,
                });
            }
            if self.peek_str(">") {
                self.pos += 1;
                return Ok(Element {
                    name,
                    attrs,
                    self_closing: false,
                });
            }

            let key = self.read_name();
            if key.is_empty() {
                return Err(FabricError::InvalidState(format!(
                    "malformed attribute at offset {}",
                    self.pos
                )));
            }
            self.skip_whitespace();
            if !self.peek_str("=") {
                return Err(FabricError::InvalidState(format!(
                    "attribute '{}' missing '='",
                    key
                )));
            }
            self.pos += 1;
            self.skip_whitespace();
            let value = self.read_quoted()?;
            attrs.insert(key, value);
        }
    }

    fn read_closing_tag(&mut self) -> Result<String> {
        self.pos += 2; // consume "</"
        let name = self.read_name();
        self.skip_whitespace();
        if !self.peek_str(">") {
            return Err(FabricError::InvalidState(format!(
                "malformed closing tag '{}'",
                name
            )));
        }
        self.pos += 1;
        Ok(name)
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() {
            let c = bytes[self.pos] as char;
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.text[start..self.pos].to_string()
    }

    fn read_quoted(&mut self) -> Result<String> {
        if !self.peek_str("\"") {
            return Err(FabricError::InvalidState(format!(
                "expected quoted value at offset {}",
                self.pos
            )));
        }
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.text.len() && !self.peek_str("\"") {
            self.pos += 1;
        }
        if self.pos >= self.text.len() {
            return Err(FabricError::InvalidState("unterminated attribute".into()));
        }
        let value = self.text[start..self.pos].to_string();
        self.pos += 1;
        Ok(value)
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos] as char).is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek_str(&self, s: &str) -> bool {
        self.text[self.pos..].starts_with(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIORITY_TREE: &str = r#"
        <root>
          <BehaviorTree>
            <Fallback>
              <Sequence>
                <IsHealthLow health="{health}"/>
                <FleeAction ai_state="{ai_state}"/>
              </Sequence>
              <Sequence>
                <IsPlayerNearby player_distance="{player_distance}"/>
                <ChaseAction ai_state="{ai_state}"/>
              </Sequence>
              <PatrolAction ai_state="{ai_state}"/>
            </Fallback>
          </BehaviorTree>
        </root>
    "#;

    fn npc_with_tree(world: &mut World, ai: &BehaviorAi) -> EntityId {
        ai.create_npc(world, PRIORITY_TREE).unwrap()
    }

    fn set_blackboard(world: &mut World, npc: EntityId, health: f32, distance: f32) {
        let tree = &mut world
            .get_mut::<BehaviorTreeComponent>(npc)
            .unwrap()
            .tree;
        tree.blackboard_mut().set_float("health", health);
        tree.blackboard_mut().set_float("player_distance", distance);
    }

    fn state_of(world: &World, npc: EntityId) -> AiState {
        world.get::<AiStateComponent>(npc).unwrap().state
    }

    #[test]
    fn test_priority_flee_over_chase_over_patrol() {
        let ai = BehaviorAi::new();
        let mut world = World::new();
        let npc = npc_with_tree(&mut world, &ai);

        set_blackboard(&mut world, npc, 10.0, 5.0);
        ai.update(&mut world, 0.016);
        assert_eq!(state_of(&world, npc), AiState::Flee);

        set_blackboard(&mut world, npc, 80.0, 5.0);
        ai.update(&mut world, 0.016);
        assert_eq!(state_of(&world, npc), AiState::Chase);

        set_blackboard(&mut world, npc, 80.0, 50.0);
        ai.update(&mut world, 0.016);
        assert_eq!(state_of(&world, npc), AiState::Patrol);
    }

    #[test]
    fn test_tree_halts_after_completion() {
        let ai = BehaviorAi::new();
        let mut world = World::new();
        let npc = npc_with_tree(&mut world, &ai);
        set_blackboard(&mut world, npc, 80.0, 50.0);
        ai.update(&mut world, 0.016);

        let tree = &world.get::<BehaviorTreeComponent>(npc).unwrap().tree;
        assert!(tree
            .statistics()
            .values()
            .all(|&status| status == NodeStatus::Idle));
    }

    #[test]
    fn test_condition_defaults() {
        let ai = BehaviorAi::new();
        let markup = r#"<IsPlayerNearby player_distance="5.0"/>"#;
        let mut tree = ai.load_tree(markup).unwrap();
        // Default detection_range is 10: 5 <= 10
        assert_eq!(tree.tick_once(), NodeStatus::Success);

        let markup = r#"<IsPlayerNearby player_distance="15.0"/>"#;
        let mut tree = ai.load_tree(markup).unwrap();
        assert_eq!(tree.tick_once(), NodeStatus::Failure);
    }

    #[test]
    fn test_missing_port_is_failure() {
        let ai = BehaviorAi::new();
        let mut tree = ai.load_tree(r#"<IsPlayerNearby/>"#).unwrap();
        assert_eq!(tree.tick_once(), NodeStatus::Failure);
    }

    #[test]
    fn test_can_see_target_conditions() {
        let ai = BehaviorAi::new();
        let markup = r#"<CanSeeTarget target_distance="{target_distance}" target_angle="{target_angle}"
                         sight_range="20.0" sight_angle="120.0" has_los="{has_los}"/>"#;

        let mut tree = ai.load_tree(markup).unwrap();
        tree.blackboard_mut().set_float("target_distance", 10.0);
        tree.blackboard_mut().set_float("target_angle", 30.0);
        tree.blackboard_mut().set_bool("has_los", true);
        assert_eq!(tree.tick_once(), NodeStatus::Success);

        tree.blackboard_mut().set_float("target_distance", 30.0);
        assert_eq!(tree.tick_once(), NodeStatus::Failure);

        tree.blackboard_mut().set_float("target_distance", 10.0);
        tree.blackboard_mut().set_float("target_angle", 80.0);
        assert_eq!(tree.tick_once(), NodeStatus::Failure);

        tree.blackboard_mut().set_float("target_angle", 30.0);
        tree.blackboard_mut().set_bool("has_los", false);
        assert_eq!(tree.tick_once(), NodeStatus::Failure);
    }

    #[test]
    fn test_can_hear_target_is_pure_range() {
        let ai = BehaviorAi::new();
        let markup = r#"<CanHearTarget target_distance="{target_distance}" hearing_range="10.0"/>"#;
        let mut tree = ai.load_tree(markup).unwrap();

        tree.blackboard_mut().set_float("target_distance", 5.0);
        assert_eq!(tree.tick_once(), NodeStatus::Success);
        tree.blackboard_mut().set_float("target_distance", 15.0);
        assert_eq!(tree.tick_once(), NodeStatus::Failure);
    }

    #[test]
    fn test_has_target() {
        let ai = BehaviorAi::new();
        let mut tree = ai
            .load_tree(r#"<HasTarget has_target="{has_target}"/>"#)
            .unwrap();
        tree.blackboard_mut().set_bool("has_target", true);
        assert_eq!(tree.tick_once(), NodeStatus::Success);
        tree.blackboard_mut().set_bool("has_target", false);
        assert_eq!(tree.tick_once(), NodeStatus::Failure);
    }

    #[test]
    fn test_observer_paths_and_depths() {
        let ai = BehaviorAi::new();
        let tree = ai.load_tree(PRIORITY_TREE).unwrap();

        let listing = debug_listing(&tree);
        assert_eq!(listing.len(), 8);
        assert_eq!(listing[0].name, "Fallback");
        assert_eq!(listing[0].depth, 0);
        assert_eq!(listing[1].name, "Sequence");
        assert_eq!(listing[1].depth, 1);
        assert_eq!(listing[2].name, "IsHealthLow");
        assert_eq!(listing[2].depth, 2);
        assert_eq!(listing[7].name, "PatrolAction");
        assert_eq!(listing[7].depth, 1);
        assert!(listing.iter().all(|info| info.status == "IDLE"));
    }

    #[test]
    fn test_statistics_reflect_last_tick() {
        let ai = BehaviorAi::new();
        let mut tree = ai.load_tree(PRIORITY_TREE).unwrap();
        tree.blackboard_mut().set_float("health", 10.0);
        tree.blackboard_mut().set_float("player_distance", 5.0);
        tree.tick_once();

        let paths = tree.uid_to_path().clone();
        let stats = tree.statistics();
        let status_of = |suffix: &str| {
            let uid = paths
                .iter()
                .find(|(_, p)| p.ends_with(suffix))
                .map(|(uid, _)| *uid)
                .unwrap();
            stats[&uid]
        };

        assert_eq!(status_of("IsHealthLow"), NodeStatus::Success);
        assert_eq!(status_of("FleeAction"), NodeStatus::Success);
        assert_eq!(status_of("Fallback"), NodeStatus::Success);
    }

    #[test]
    fn test_unregistered_node_type_fails_to_load() {
        let ai = BehaviorAi::new();
        let err = ai.load_tree(r#"<Unknowable/>"#).unwrap_err();
        assert!(matches!(err, FabricError::NotFound(_)));
    }

    #[test]
    fn test_blend_timer_bridge() {
        let ai = BehaviorAi::new();
        let mut world = World::new();
        let npc = npc_with_tree(&mut world, &ai);
        BehaviorAi::set_animation_mapping(&mut world, npc, AiAnimationMapping::default());

        set_blackboard(&mut world, npc, 10.0, 5.0);
        ai.update(&mut world, 0.016);

        let anim = world.get::<AiAnimationState>(npc).unwrap();
        assert!(anim.blending);
        assert_eq!(anim.blend_timer, 0.0);
        assert_eq!(anim.previous_state, AiState::Flee);

        // Same state keeps blending until the duration elapses
        ai.update(&mut world, 0.1);
        assert!(world.get::<AiAnimationState>(npc).unwrap().blending);
        ai.update(&mut world, 0.15);
        assert!(!world.get::<AiAnimationState>(npc).unwrap().blending);
    }

    #[test]
    fn test_clip_for_state() {
        let mapping = AiAnimationMapping::default();
        assert_eq!(BehaviorAi::clip_for(&mapping, AiState::Idle), "idle");
        assert_eq!(BehaviorAi::clip_for(&mapping, AiState::Patrol), "walk");
        assert_eq!(BehaviorAi::clip_for(&mapping, AiState::Chase), "run");
        assert_eq!(BehaviorAi::clip_for(&mapping, AiState::Attack), "attack");
        assert_eq!(BehaviorAi::clip_for(&mapping, AiState::Flee), "run_fast");
    }
}
