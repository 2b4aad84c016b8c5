//! A tiny scripted interpreter for unit tests.
//!
//! One room (1) holding the player (2) and a leather wallet (3) with keys
//! (4) inside. Memory layout: score, status bits, wallet open, keys parent,
//! wallet parent, button RAM byte.

use std::sync::atomic::{AtomicUsize, Ordering};

use ifact_rng::RngTriple;

use crate::error::InterpreterError;
use crate::interpreter::{GameInterpreter, StepOutcome};
use crate::rom::RomImage;
use crate::state::{ChangeFlags, GameState, Registers};
use crate::world::{DictionaryWord, ObjectNum, WordFlags, WorldObject};

/// Live interpreters loaded from [`COUNTED_ROM`], across all threads
pub(crate) static LIVE: AtomicUsize = AtomicUsize::new(0);

pub(crate) const COUNTED_ROM: &[u8] = b"counted mock story";

const SCORE: usize = 0;
const STATUS: usize = 1;
const WALLET_OPEN: usize = 2;
const KEYS_PARENT: usize = 3;
const WALLET_PARENT: usize = 4;
const BUTTON: usize = 5;

const OVER: u8 = 0x01;
const WON: u8 = 0x02;
const HALTED: u8 = 0x04;

const INITIAL: [u8; 6] = [0, 0, 0, 3, 1, 0];

pub(crate) const UNSUPPORTED_ROM: &[u8] = b"unsupported";

pub(crate) fn rom() -> RomImage {
    RomImage::from_bytes(b"mock story".to_vec())
}

#[derive(Debug)]
pub(crate) struct MockInterpreter {
    memory: [u8; 6],
    flags: ChangeFlags,
    narrative: String,
    counted: bool,
}

impl Drop for MockInterpreter {
    fn drop(&mut self) {
        if self.counted {
            LIVE.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl MockInterpreter {
    pub(crate) fn new() -> Self {
        Self {
            memory: INITIAL,
            flags: ChangeFlags::default(),
            narrative: String::new(),
            counted: false,
        }
    }

    fn run(&mut self, command: &str) -> String {
        let mem = &mut self.memory;
        let open = mem[WALLET_OPEN] != 0;
        match command.trim() {
            "look" => "Kitchen\nYou can see a leather wallet here.".into(),
            "inventory" => "You are empty-handed.".into(),
            "examine wallet" | "examine leather" | "examine leather wallet" => "A worn leather wallet.".into(),
            "examine keys" if open => "A ring of brass keys.".into(),
            "examine kitchen" => "A cramped kitchen.".into(),
            "open wallet" | "unzip wallet" if !open => {
                mem[WALLET_OPEN] = 1;
                "You open the wallet, revealing some keys.".into()
            }
            "open wallet" | "unzip wallet" => "It's already open.".into(),
            "take keys" | "get keys" if open && mem[KEYS_PARENT] == 3 => {
                mem[KEYS_PARENT] = 2;
                "Taken.".into()
            }
            "read wallet" if mem[WALLET_PARENT] != 2 => {
                mem[WALLET_PARENT] = 2;
                "(Taken)\nThere is nothing written on it.".into()
            }
            "press button" => {
                mem[BUTTON] ^= 1;
                "Click.".into()
            }
            "sing" => {
                mem[SCORE] = mem[SCORE].wrapping_add(1);
                "You sing a little song.".into()
            }
            "jump off cliff" => {
                mem[STATUS] |= OVER;
                "*** You have died ***".into()
            }
            "dance" => {
                mem[STATUS] |= OVER | WON;
                "*** You have won ***".into()
            }
            "xyzzy" | "examine dragon" => {
                mem[STATUS] |= HALTED;
                String::new()
            }
            "crash" => panic!("mock interpreter crashed"),
            "north" => "The door is locked.".into(),
            _ => "You can't see any such thing.".into(),
        }
    }

    fn objects(&self) -> Vec<WorldObject> {
        let mut objs = vec![
            WorldObject::new(0, ""),
            WorldObject::new(1, "Kitchen"),
            WorldObject::new(2, "yourself"),
            WorldObject::new(3, "leather wallet"),
            WorldObject::new(4, "keys"),
        ];
        objs[2].parent = 1;
        objs[3].parent = ObjectNum::from(self.memory[WALLET_PARENT]);
        objs[4].parent = ObjectNum::from(self.memory[KEYS_PARENT]);
        objs[3].set_attr(1, self.memory[WALLET_OPEN] != 0);
        // Rebuild child/sibling chains from parents
        for num in (2..objs.len()).rev() {
            let parent = usize::from(objs[num].parent);
            objs[num].sibling = objs[parent].child;
            objs[parent].child = num as ObjectNum;
        }
        objs
    }
}

impl GameInterpreter for MockInterpreter {
    fn load(rom: &RomImage, _seed: Option<i64>) -> Result<Self, InterpreterError> {
        if rom.bytes().is_empty() {
            return Err(InterpreterError::Load("empty rom".into()));
        }
        let mut interp = Self::new();
        if rom.bytes() == COUNTED_ROM {
            LIVE.fetch_add(1, Ordering::SeqCst);
            interp.counted = true;
        }
        Ok(interp)
    }

    fn is_supported(rom: &RomImage) -> bool {
        rom.bytes() != UNSUPPORTED_ROM
    }

    fn reset(&mut self) -> Result<String, InterpreterError> {
        self.memory = INITIAL;
        self.flags = ChangeFlags::default();
        self.narrative = "Kitchen".into();
        Ok(self.narrative.clone())
    }

    fn step(&mut self, command: &str) -> Result<StepOutcome, InterpreterError> {
        let before_objects = self.objects();
        let before_ram = self.memory[BUTTON];
        let observation = self.run(command);
        self.flags = ChangeFlags {
            objects_changed: before_objects != self.objects(),
            ram_changed: before_ram != self.memory[BUTTON],
        };
        self.narrative = observation.clone();
        Ok(StepOutcome {
            observation,
            score: self.score(),
            done: self.game_over(),
        })
    }

    fn get_state(&self) -> GameState {
        GameState::new(
            self.memory.to_vec(),
            Vec::new(),
            Registers::default(),
            RngTriple::default(),
            self.narrative.clone(),
            self.flags,
        )
    }

    fn set_state(&mut self, state: &GameState) -> Result<(), InterpreterError> {
        self.memory = state
            .memory()
            .try_into()
            .map_err(|_| InterpreterError::IncompatibleState("memory size".into()))?;
        self.flags = state.flags();
        self.narrative = state.narrative().to_string();
        Ok(())
    }

    fn world_objects(&self, _clean: bool) -> Vec<WorldObject> {
        self.objects()
    }

    fn dictionary(&self) -> Vec<DictionaryWord> {
        vec![
            DictionaryWord::new("kitchen", WordFlags::NOUN),
            DictionaryWord::new("dragon", WordFlags::NOUN),
            DictionaryWord::new("leather", WordFlags::ADJ),
            DictionaryWord::new("wallet", WordFlags::NOUN),
            DictionaryWord::new("keys", WordFlags::NOUN | WordFlags::PLURAL),
            DictionaryWord::new("open", WordFlags::VERB),
            DictionaryWord::new("take", WordFlags::VERB),
        ]
    }

    fn max_word_length(&self) -> usize {
        9
    }

    fn special_ram(&self) -> Vec<u8> {
        vec![self.memory[BUTTON]]
    }

    fn world_changed(&self) -> bool {
        self.flags.objects_changed || self.flags.ram_changed
    }

    fn game_over(&self) -> bool {
        self.memory[STATUS] & OVER != 0
    }

    fn victory(&self) -> bool {
        self.memory[STATUS] & WON != 0
    }

    fn halted(&self) -> bool {
        self.memory[STATUS] & HALTED != 0
    }

    fn score(&self) -> i32 {
        i32::from(self.memory[SCORE])
    }

    fn moves(&self) -> u32 {
        0
    }

    fn max_score(&self) -> i32 {
        10
    }

    fn player_object_num(&self) -> ObjectNum {
        2
    }
}
