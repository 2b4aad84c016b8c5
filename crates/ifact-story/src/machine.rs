//! The story machine
//!
//! Executes a [`Story`] one command at a time. All mutable state lives in
//! [`World`] plus the RNG, and both round-trip through [`GameState`], so a
//! restored snapshot always replays identically.
//!
//! Memory layout: score (i16 BE), moves (u16 BE), status byte, then six
//! bytes per object (parent u16 BE, attributes u32 BE), then special RAM.

use std::sync::Arc;

use bitflags::bitflags;
use ifact_core::interpreter::has_marker;
use ifact_core::{
    BatchHit, ChangeFlags, DictionaryWord, GameInterpreter, GameState, InterpreterError,
    ObjectNum, Registers, RomImage, StepOutcome, WorldObject,
};
use ifact_rng::StoryRng;
use tracing::{debug, trace};

use crate::parser::{Command, NounPhrase, Parser, Verb};
use crate::story::{Exit, ItemAttrs, PLAYER, Story, StoryDef};

const HEADER_LEN: usize = 5;
const OBJECT_LEN: usize = 6;

/// Property holding an item's point value
pub const PROP_POINTS: u8 = 1;
/// Property holding an item's special-RAM switch index
pub const PROP_SWITCH: u8 = 2;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Status: u8 {
        const OVER = 0x01;
        const WON = 0x02;
        const HALTED = 0x04;
    }
}

/// Everything a command can change
#[derive(Debug, Clone, PartialEq, Eq)]
struct World {
    score: i16,
    moves: u16,
    status: Status,
    /// Indexed by object number, entry 0 unused
    parents: Vec<ObjectNum>,
    attrs: Vec<ItemAttrs>,
    ram: Vec<u8>,
}

impl World {
    fn initial(story: &Story) -> Self {
        let mut attrs = vec![ItemAttrs::empty(); story.initial_parents.len()];
        for num in story.item_nums() {
            if let Some(item) = story.item(num) {
                attrs[usize::from(num)] = item.attributes;
            }
        }
        attrs[usize::from(story.start)] |= ItemAttrs::VISITED;
        Self {
            score: 0,
            moves: 0,
            status: Status::empty(),
            parents: story.initial_parents.clone(),
            attrs,
            ram: vec![0; story.def.special_ram],
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + OBJECT_LEN * self.parents.len() + self.ram.len());
        out.extend_from_slice(&self.score.to_be_bytes());
        out.extend_from_slice(&self.moves.to_be_bytes());
        out.push(self.status.bits());
        for (parent, attrs) in self.parents.iter().zip(&self.attrs).skip(1) {
            out.extend_from_slice(&parent.to_be_bytes());
            out.extend_from_slice(&attrs.bits().to_be_bytes());
        }
        out.extend_from_slice(&self.ram);
        out
    }

    fn decode(memory: &[u8], story: &Story) -> Result<Self, InterpreterError> {
        let objects = story.object_count();
        let expected = HEADER_LEN + OBJECT_LEN * objects + story.def.special_ram;
        if memory.len() != expected {
            return Err(InterpreterError::IncompatibleState(format!(
                "memory is {} bytes, story '{}' needs {expected}",
                memory.len(),
                story.def.title
            )));
        }
        let mut parents = vec![0];
        let mut attrs = vec![ItemAttrs::empty()];
        for chunk in memory[HEADER_LEN..HEADER_LEN + OBJECT_LEN * objects].chunks_exact(OBJECT_LEN) {
            let parent = u16::from_be_bytes([chunk[0], chunk[1]]);
            if usize::from(parent) > objects {
                return Err(InterpreterError::IncompatibleState(format!(
                    "parent {parent} out of range"
                )));
            }
            parents.push(parent);
            attrs.push(ItemAttrs::from_bits_retain(u32::from_be_bytes([
                chunk[2], chunk[3], chunk[4], chunk[5],
            ])));
        }
        Ok(Self {
            score: i16::from_be_bytes([memory[0], memory[1]]),
            moves: u16::from_be_bytes([memory[2], memory[3]]),
            status: Status::from_bits_retain(memory[4]),
            parents,
            attrs,
            ram: memory[HEADER_LEN + OBJECT_LEN * objects..].to_vec(),
        })
    }
}

/// In-process interpreter for JSON story ROMs.
pub struct StoryMachine {
    story: Arc<Story>,
    parser: Arc<Parser>,
    seed: Option<i64>,
    world: World,
    rng: StoryRng,
    flags: ChangeFlags,
    narrative: String,
}

impl core::fmt::Debug for StoryMachine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoryMachine")
            .field("title", &self.story.def.title)
            .field("score", &self.world.score)
            .field("moves", &self.world.moves)
            .field("location", &self.location())
            .finish()
    }
}

impl StoryMachine {
    /// Build a machine for an already parsed story.
    pub fn new(story: Arc<Story>, seed: Option<i64>) -> Self {
        let parser = Arc::new(Parser::new(&story));
        let world = World::initial(&story);
        Self {
            story,
            parser,
            seed,
            world,
            rng: StoryRng::new(seed.unwrap_or(0)),
            flags: ChangeFlags::default(),
            narrative: String::new(),
        }
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    /// Room currently holding the player
    pub fn location(&self) -> ObjectNum {
        self.world.parents[usize::from(PLAYER)]
    }

    fn parent(&self, num: ObjectNum) -> ObjectNum {
        self.world.parents.get(usize::from(num)).copied().unwrap_or(0)
    }

    fn attrs(&self, num: ObjectNum) -> ItemAttrs {
        self.world.attrs.get(usize::from(num)).copied().unwrap_or_default()
    }

    fn set_attrs(&mut self, num: ObjectNum, attrs: ItemAttrs, value: bool) {
        if let Some(slot) = self.world.attrs.get_mut(usize::from(num)) {
            slot.set(attrs, value);
        }
    }

    fn move_to(&mut self, num: ObjectNum, parent: ObjectNum) {
        if let Some(slot) = self.world.parents.get_mut(usize::from(num)) {
            *slot = parent;
        }
    }

    fn name(&self, num: ObjectNum) -> &str {
        self.story.name(num)
    }

    /// First container between `num` and the current room that `passes`
    /// rejects, or 0 when the path is clear. Objects outside the room
    /// report themselves.
    fn barrier(&self, num: ObjectNum, passes: impl Fn(ItemAttrs) -> bool) -> ObjectNum {
        let location = self.location();
        let mut current = self.parent(num);
        for _ in 0..self.world.parents.len() {
            if current == location {
                return 0;
            }
            if current == 0 || self.story.is_room(current) {
                return num;
            }
            if current != PLAYER && !passes(self.attrs(current)) {
                return current;
            }
            current = self.parent(current);
        }
        num
    }

    fn visible(&self, num: ObjectNum) -> bool {
        self.barrier(num, |a| a.intersects(ItemAttrs::OPEN | ItemAttrs::TRANSPARENT)) == 0
    }

    /// Items whose parent is `parent`, in object order
    fn contents(&self, parent: ObjectNum) -> Vec<ObjectNum> {
        self.story
            .item_nums()
            .filter(|n| self.parent(*n) == parent)
            .collect()
    }

    fn list(&self, nums: &[ObjectNum]) -> String {
        let names: Vec<&str> = nums.iter().map(|n| self.name(*n)).collect();
        match names.as_slice() {
            [] => String::new(),
            [one] => (*one).to_string(),
            [init @ .., last] => format!("{} and {last}", init.join(", ")),
        }
    }

    fn matches(&self, num: ObjectNum, phrase: &NounPhrase) -> bool {
        let cut = |w: &str| self.parser.cut(&w.to_lowercase());
        if let Some(room) = self.story.room(num) {
            let words: Vec<String> = room.name.split_whitespace().map(cut).collect();
            return phrase.iter().all(|w| words.contains(w));
        }
        let Some(item) = self.story.item(num) else {
            return false;
        };
        let nouns: Vec<String> = item.nouns.iter().map(|w| cut(w)).collect();
        let adjectives: Vec<String> = item.adjectives.iter().map(|w| cut(w)).collect();
        phrase.iter().any(|w| nouns.contains(w))
            && phrase.iter().all(|w| nouns.contains(w) || adjectives.contains(w))
    }

    fn resolve(&self, phrase: &NounPhrase) -> Option<ObjectNum> {
        let location = self.location();
        if self.matches(location, phrase) {
            return Some(location);
        }
        self.story
            .item_nums()
            .find(|n| self.visible(*n) && self.matches(*n, phrase))
    }

    fn award(&mut self, num: ObjectNum) {
        let points = self.story.item(num).map_or(0, |item| item.points);
        if points > 0 && !self.attrs(num).contains(ItemAttrs::SCORED) {
            self.world.score = self.world.score.saturating_add(i16::from(points));
            self.set_attrs(num, ItemAttrs::SCORED, true);
        }
    }

    /// Take `num` if the player does not hold it yet. Returns the refusal
    /// message when it cannot be taken.
    fn pick_up(&mut self, num: ObjectNum) -> Result<(), String> {
        if self.parent(num) == PLAYER {
            return Ok(());
        }
        let attrs = self.attrs(num);
        if self.story.is_room(num) || !attrs.contains(ItemAttrs::TAKEABLE) {
            return Err("That's hardly portable.".into());
        }
        let blocker = self.barrier(num, |a| a.contains(ItemAttrs::OPEN));
        if blocker != 0 {
            return Err(format!("The {} is closed.", self.name(blocker)));
        }
        self.move_to(num, PLAYER);
        self.award(num);
        Ok(())
    }

    fn describe_room(&self) -> String {
        let location = self.location();
        let mut text = self.name(location).to_string();
        if let Some(room) = self.story.room(location)
            && !room.description.is_empty()
        {
            text.push('\n');
            text.push_str(&room.description);
        }
        let here = self.contents(location);
        if !here.is_empty() {
            text.push_str(&format!("\nYou can see {} here.", self.list(&here)));
        }
        text
    }

    fn examine(&self, num: ObjectNum) -> String {
        if let Some(room) = self.story.room(num) {
            return if room.description.is_empty() {
                format!("You see nothing special about the {}.", room.name)
            } else {
                room.description.clone()
            };
        }
        let Some(item) = self.story.item(num) else {
            return "You can't see any such thing.".into();
        };
        let mut text = if item.description.is_empty() {
            format!("You see nothing special about the {}.", item.name)
        } else {
            item.description.clone()
        };
        let attrs = self.attrs(num);
        if attrs.contains(ItemAttrs::CONTAINER) {
            let inside = self.contents(num);
            let open = attrs.contains(ItemAttrs::OPEN);
            let see_in = open || attrs.contains(ItemAttrs::TRANSPARENT);
            text.push(' ');
            text.push_str(&match (open, see_in && !inside.is_empty()) {
                (true, true) => format!("It is open. Inside you see {}.", self.list(&inside)),
                (true, false) => "It is open and empty.".to_string(),
                (false, true) => format!("It is closed, but you can see {} inside.", self.list(&inside)),
                (false, false) => "It is closed.".to_string(),
            });
        }
        if let Some(index) = item.switch {
            let on = self.world.ram.get(index).is_some_and(|b| *b != 0);
            text.push_str(if on { " It is switched on." } else { " It is switched off." });
        }
        if attrs.contains(ItemAttrs::WORN) {
            text.push_str(" You are wearing it.");
        }
        text
    }

    fn describe_inventory(&self) -> String {
        let carried = self.contents(PLAYER);
        if carried.is_empty() {
            return "You are empty-handed.".into();
        }
        let mut text = String::from("You are carrying:");
        for num in carried {
            text.push_str("\n  ");
            text.push_str(self.name(num));
            if self.attrs(num).contains(ItemAttrs::WORN) {
                text.push_str(" (being worn)");
            }
        }
        text
    }

    fn go(&mut self, direction: &str) -> String {
        let exit = self
            .story
            .exits
            .get(&self.location())
            .and_then(|table| table.get(direction))
            .cloned();
        match exit {
            Some(Exit::To(room)) => {
                self.move_to(PLAYER, room);
                self.set_attrs(room, ItemAttrs::VISITED, true);
                let mut text = self.describe_room();
                let (goal, deadly) = self.story.room(room).map_or((false, false), |r| (r.goal, r.deadly));
                if deadly {
                    self.world.status |= Status::OVER;
                    text.push_str("\n\n*** You have died ***");
                } else if goal {
                    self.world.status |= Status::OVER | Status::WON;
                    text.push_str("\n\n*** You have won ***");
                }
                text
            }
            Some(Exit::Blocked(message)) => message,
            None => "You can't go that way.".into(),
        }
    }

    fn take_all(&mut self) -> String {
        let location = self.location();
        let takeable: Vec<ObjectNum> = self
            .contents(location)
            .into_iter()
            .filter(|n| self.attrs(*n).contains(ItemAttrs::TAKEABLE))
            .collect();
        if takeable.is_empty() {
            return "There is nothing here to take.".into();
        }
        let mut lines = Vec::with_capacity(takeable.len());
        for num in takeable {
            let result = match self.pick_up(num) {
                Ok(()) => "Taken.".to_string(),
                Err(message) => message,
            };
            lines.push(format!("{}: {result}", self.name(num)));
        }
        lines.join("\n")
    }

    fn act(&mut self, verb: Verb, num: ObjectNum) -> String {
        let name = self.name(num).to_string();
        let attrs = self.attrs(num);
        match verb {
            Verb::Examine => self.examine(num),
            Verb::Take if self.parent(num) == PLAYER => "You already have that.".into(),
            Verb::Take => match self.pick_up(num) {
                Ok(()) => "Taken.".into(),
                Err(message) => message,
            },
            Verb::Drop if self.parent(num) != PLAYER => "You're not carrying that.".into(),
            Verb::Drop => {
                self.move_to(num, self.location());
                self.set_attrs(num, ItemAttrs::WORN, false);
                "Dropped.".into()
            }
            Verb::Open if !attrs.contains(ItemAttrs::OPENABLE) => {
                "That's not something you can open.".into()
            }
            Verb::Open if attrs.contains(ItemAttrs::OPEN) => "It's already open.".into(),
            Verb::Open => {
                let blocker = self.barrier(num, |a| a.contains(ItemAttrs::OPEN));
                if blocker != 0 && blocker != num {
                    return format!("The {} is closed.", self.name(blocker));
                }
                self.set_attrs(num, ItemAttrs::OPEN, true);
                let inside = self.contents(num);
                if inside.is_empty() {
                    format!("You open the {name}.")
                } else {
                    format!("You open the {name}, revealing {}.", self.list(&inside))
                }
            }
            Verb::Close if !attrs.contains(ItemAttrs::OPENABLE) => {
                "That's not something you can close.".into()
            }
            Verb::Close if !attrs.contains(ItemAttrs::OPEN) => "It's already closed.".into(),
            Verb::Close => {
                self.set_attrs(num, ItemAttrs::OPEN, false);
                format!("You close the {name}.")
            }
            Verb::Push => match self.story.item(num).and_then(|item| item.switch) {
                Some(index) => {
                    if let Some(byte) = self.world.ram.get_mut(index) {
                        *byte ^= 1;
                    }
                    "Click.".into()
                }
                None => "Nothing obvious happens.".into(),
            },
            Verb::Read => {
                let Some(text) = self.story.item(num).and_then(|item| item.text.clone()) else {
                    return format!("There's nothing written on the {name}.");
                };
                let carried = self.parent(num) == PLAYER;
                if !carried && attrs.contains(ItemAttrs::TAKEABLE) && self.pick_up(num).is_ok() {
                    format!("(Taken)\n{text}")
                } else {
                    text
                }
            }
            Verb::Wear if !attrs.contains(ItemAttrs::WEARABLE) => "You can't wear that.".into(),
            Verb::Wear if attrs.contains(ItemAttrs::WORN) => format!("You're already wearing the {name}."),
            Verb::Wear => {
                let implicit = self.parent(num) != PLAYER;
                if let Err(message) = self.pick_up(num) {
                    return message;
                }
                self.set_attrs(num, ItemAttrs::WORN, true);
                let prefix = if implicit { "(Taken)\n" } else { "" };
                format!("{prefix}You put on the {name}.")
            }
            other => format!("That's not something you can {other}."),
        }
    }

    fn put(&mut self, item: ObjectNum, into: ObjectNum) -> String {
        if self.parent(item) != PLAYER {
            return format!("You need to be holding the {} first.", self.name(item));
        }
        let attrs = self.attrs(into);
        if !attrs.contains(ItemAttrs::CONTAINER) {
            return format!("You can't put things in the {}.", self.name(into));
        }
        if !attrs.contains(ItemAttrs::OPEN) {
            return format!("The {} is closed.", self.name(into));
        }
        // Refuse cycles: `into` may not sit inside `item`
        let mut current = into;
        for _ in 0..self.world.parents.len() {
            if current == item {
                return "You can't put something inside itself.".into();
            }
            if current == 0 {
                break;
            }
            current = self.parent(current);
        }
        self.move_to(item, into);
        self.set_attrs(item, ItemAttrs::WORN, false);
        format!("You put the {} in the {}.", self.name(item), self.name(into))
    }

    /// Move wandering items. Draws from the RNG, so the outcome is part of
    /// the snapshot.
    fn wander(&mut self) {
        let rooms: Vec<ObjectNum> = (0..self.story.def.rooms.len())
            .filter_map(|i| ObjectNum::try_from(i + 2).ok())
            .collect();
        let wanderers: Vec<ObjectNum> = self
            .story
            .item_nums()
            .filter(|n| self.story.item(*n).is_some_and(|item| item.wanders))
            .filter(|n| self.story.is_room(self.parent(*n)))
            .collect();
        for num in wanderers {
            if self.rng.one_in(2)
                && let Some(room) = self.rng.choose(&rooms).copied()
            {
                self.move_to(num, room);
            }
        }
    }

    /// Run one parsed command. Returns the response and whether a turn
    /// passed.
    fn execute(&mut self, input: &str) -> (String, bool) {
        let command = match self.parser.parse(input) {
            Ok(command) => command,
            Err(err) => return (err.to_string(), false),
        };
        let not_here = || ("You can't see any such thing.".to_string(), false);
        match command {
            Command::Halt => {
                self.world.status |= Status::HALTED;
                (String::new(), false)
            }
            Command::Bare(Verb::Score) => (
                format!(
                    "Your score is {} out of a possible {}, in {} turns.",
                    self.world.score, self.story.def.max_score, self.world.moves
                ),
                false,
            ),
            Command::Bare(Verb::Version) => (format!("{}\nA story for the ifact machine.", self.story.def.title), false),
            Command::Bare(Verb::Look) => (self.describe_room(), true),
            Command::Bare(Verb::Inventory) => (self.describe_inventory(), true),
            Command::Bare(_) => ("Time passes.".into(), true),
            Command::Go(direction) => (self.go(&direction), true),
            Command::TakeAll => (self.take_all(), true),
            Command::Object(verb, phrase) => match self.resolve(&phrase) {
                Some(num) => (self.act(verb, num), true),
                None => not_here(),
            },
            Command::Put { item, into } => match (self.resolve(&item), self.resolve(&into)) {
                (Some(item), Some(into)) => (self.put(item, into), true),
                _ => not_here(),
            },
        }
    }

    fn restore_world(&mut self, world: &World, rng: ifact_rng::RngTriple) {
        self.world.clone_from(world);
        self.rng.set_triple(rng);
    }
}

impl GameInterpreter for StoryMachine {
    fn load(rom: &RomImage, seed: Option<i64>) -> Result<Self, InterpreterError> {
        let story = Story::parse(rom.bytes())?;
        debug!(title = %story.def.title, objects = story.object_count(), "story loaded");
        let mut machine = Self::new(Arc::new(story), seed);
        machine.reset()?;
        Ok(machine)
    }

    fn is_supported(rom: &RomImage) -> bool {
        serde_json::from_slice::<StoryDef>(rom.bytes()).is_ok_and(|def| def.supported)
    }

    fn reset(&mut self) -> Result<String, InterpreterError> {
        self.world = World::initial(&self.story);
        self.rng.reseed(self.seed.unwrap_or(0));
        self.flags = ChangeFlags::default();
        let intro = &self.story.def.intro;
        self.narrative = if intro.is_empty() {
            self.describe_room()
        } else {
            format!("{intro}\n\n{}", self.describe_room())
        };
        Ok(self.narrative.clone())
    }

    fn step(&mut self, command: &str) -> Result<StepOutcome, InterpreterError> {
        let before_objects = self.world_objects(true);
        let before_ram = self.world.ram.clone();
        let observation = if self.world.status.contains(Status::HALTED) {
            String::new()
        } else if self.world.status.contains(Status::OVER) {
            "The game is over.".to_string()
        } else {
            let (text, turn) = self.execute(command);
            if turn {
                self.world.moves = self.world.moves.wrapping_add(1);
                self.wander();
            }
            text
        };
        self.flags = ChangeFlags {
            objects_changed: before_objects != self.world_objects(true),
            ram_changed: before_ram != self.world.ram,
        };
        trace!(command, changed = self.world_changed(), "step");
        self.narrative.clone_from(&observation);
        Ok(StepOutcome {
            observation,
            score: self.score(),
            done: self.game_over(),
        })
    }

    fn get_state(&self) -> GameState {
        GameState::new(
            self.world.encode(),
            Vec::new(),
            Registers {
                frame_count: 1,
                ..Registers::default()
            },
            self.rng.triple(),
            self.narrative.clone(),
            self.flags,
        )
    }

    fn set_state(&mut self, state: &GameState) -> Result<(), InterpreterError> {
        self.world = World::decode(state.memory(), &self.story)?;
        self.rng.set_triple(state.rng());
        self.flags = state.flags();
        self.narrative = state.narrative().to_string();
        Ok(())
    }

    fn world_objects(&self, clean: bool) -> Vec<WorldObject> {
        let count = self.world.parents.len();
        let mut objects: Vec<WorldObject> = (0..count)
            .filter_map(|n| ObjectNum::try_from(n).ok())
            .map(|n| WorldObject::new(n, self.name(n)))
            .collect();
        for obj in objects.iter_mut().skip(1) {
            let item = self.story.item(obj.num);
            obj.parent = if clean && item.is_some_and(|i| i.wanders) {
                0
            } else {
                self.parent(obj.num)
            };
            let bits = self.attrs(obj.num).bits();
            for attr in 0..32u8 {
                if bits & (1 << attr) != 0 {
                    obj.set_attr(attr, true);
                }
            }
            if let Some(item) = item {
                if item.points > 0 {
                    obj.properties.insert(PROP_POINTS, vec![item.points]);
                }
                if let Some(index) = item.switch {
                    obj.properties.insert(PROP_SWITCH, vec![u8::try_from(index).unwrap_or(u8::MAX)]);
                }
            }
        }
        // Rebuild child/sibling chains so children list in object order
        for index in (1..objects.len()).rev() {
            let parent = usize::from(objects[index].parent);
            if parent == 0 || parent >= objects.len() {
                continue;
            }
            objects[index].sibling = objects[parent].child;
            objects[parent].child = objects[index].num;
        }
        objects
    }

    fn dictionary(&self) -> Vec<DictionaryWord> {
        self.parser.dictionary()
    }

    fn max_word_length(&self) -> usize {
        self.parser.max_word_length()
    }

    fn special_ram(&self) -> Vec<u8> {
        self.world.ram.clone()
    }

    fn world_changed(&self) -> bool {
        self.flags.objects_changed || self.flags.ram_changed
    }

    fn game_over(&self) -> bool {
        self.world.status.contains(Status::OVER)
    }

    fn victory(&self) -> bool {
        self.world.status.contains(Status::WON)
    }

    fn halted(&self) -> bool {
        self.world.status.contains(Status::HALTED)
    }

    fn score(&self) -> i32 {
        i32::from(self.world.score)
    }

    fn moves(&self) -> u32 {
        u32::from(self.world.moves)
    }

    fn max_score(&self) -> i32 {
        i32::from(self.story.def.max_score)
    }

    fn player_object_num(&self) -> ObjectNum {
        PLAYER
    }

    /// Decodes the reference once and replays every candidate from the
    /// decoded world instead of a full snapshot restore. A halted candidate
    /// needs no reset since the next candidate overwrites all state.
    fn filter_candidates(
        &mut self,
        reference: &GameState,
        candidates: &[String],
        pickup_marker: &str,
    ) -> Result<Vec<BatchHit>, InterpreterError> {
        self.set_state(reference)?;
        let base = self.world.clone();
        let base_rng = self.rng.triple();
        let base_score = self.score();
        let mut hits = Vec::new();
        for text in candidates {
            self.restore_world(&base, base_rng);
            let outcome = self.step(text)?;
            if self.halted() {
                trace!(candidate = %text, "candidate halted the story");
                continue;
            }
            let effective = outcome.score != base_score || outcome.done || self.world_changed();
            if effective && !has_marker(&outcome.observation, pickup_marker) {
                hits.push(BatchHit {
                    text: text.clone(),
                    digest: self.world_state_hash(),
                });
            }
        }
        self.set_state(reference)?;
        Ok(hits)
    }
}
