//! A bus transport for use in unit tests that decodes the frames sent to it and models the
//! controller's register file, so tests can spy on what was sent and script what is read back.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::vec::Vec;

use hal::blocking::delay::DelayMs;
use hal::digital::v2::OutputPin;

use super::bus::{BusConfig, BusTransport, ClockDivider};
use super::{CMD_READ, CMD_WRITE, DATA_READ, DATA_WRITE};
use crate::command::consts::*;

/// A register-level access decoded from the frames on the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Command(u8),
    Write(u8, u8),
    Read(u8, u8),
    Status(u8),
}

/// A raw bus, pin, or delay event, in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Begin,
    End,
    Write(Vec<u8>, bool),
    Init(BusConfig),
    Clock(ClockDivider),
    Deinit,
    Pin(bool),
    Delay(u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpyError;

struct State {
    regs: [u8; 256],
    scripted: HashMap<u8, VecDeque<u8>>,
    status: VecDeque<u8>,
    selected: u8,
    selector: Option<u8>,
    clock: Option<ClockDivider>,
    sent: Vec<Sent>,
    events: Vec<Event>,
    fail_write: bool,
    fail_clock: bool,
    fail_initialize: bool,
}

impl State {
    /// Bits the controller clears on its own once an operation completes.
    fn self_clearing(reg: u8) -> u8 {
        match reg {
            DCR => DCR_LINESQUTRI_STATUS | DCR_CIRCLE_STATUS,
            ELLIPSE => ELLIPSE_STATUS,
            MCLR => MCLR_STATUS,
            _ => 0,
        }
    }

    fn payload(&mut self, selector: u8, byte: u8) -> u8 {
        match selector {
            CMD_WRITE => {
                self.selected = byte;
                self.sent.push(Sent::Command(byte));
                0
            }
            DATA_WRITE => {
                let reg = self.selected;
                if reg == INTC2 {
                    self.regs[reg as usize] &= !byte;
                } else {
                    self.regs[reg as usize] = byte;
                }
                self.sent.push(Sent::Write(reg, byte));
                0
            }
            DATA_READ => {
                let reg = self.selected;
                let value = match self.scripted.get_mut(&reg).and_then(|q| q.pop_front()) {
                    Some(v) => v,
                    None => self.regs[reg as usize] & !Self::self_clearing(reg),
                };
                self.sent.push(Sent::Read(reg, value));
                value
            }
            CMD_READ => {
                let value = self.status.pop_front().unwrap_or(0);
                self.sent.push(Sent::Status(value));
                value
            }
            other => panic!("unknown frame selector 0x{:02X}", other),
        }
    }
}

/// Shared handle to the spy state. `split` hands out transports, pins, and delays that all log
/// into the same timeline.
#[derive(Clone)]
pub struct TestSpyBus {
    state: Rc<RefCell<State>>,
}

impl TestSpyBus {
    pub fn new() -> Self {
        let mut regs = [0u8; 256];
        regs[ID as usize] = CHIP_ID;
        TestSpyBus {
            state: Rc::new(RefCell::new(State {
                regs,
                scripted: HashMap::new(),
                status: VecDeque::new(),
                selected: 0,
                selector: None,
                clock: None,
                sent: Vec::new(),
                events: Vec::new(),
                fail_write: false,
                fail_clock: false,
                fail_initialize: false,
            })),
        }
    }

    pub fn split(&self) -> TestSpyBus {
        self.clone()
    }

    pub fn pin(&self) -> TestPin {
        TestPin {
            spy: self.clone(),
        }
    }

    pub fn delay(&self) -> TestDelay {
        TestDelay {
            spy: self.clone(),
        }
    }

    pub fn set_register(&self, reg: u8, value: u8) {
        self.state.borrow_mut().regs[reg as usize] = value;
    }

    /// Queue values returned by the next reads of `reg`, ahead of the modelled register value.
    pub fn script_reads(&self, reg: u8, values: &[u8]) {
        self.state
            .borrow_mut()
            .scripted
            .entry(reg)
            .or_insert_with(VecDeque::new)
            .extend(values.iter().cloned());
    }

    pub fn script_status(&self, values: &[u8]) {
        self.state
            .borrow_mut()
            .status
            .extend(values.iter().cloned());
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.state.borrow().regs[reg as usize]
    }

    /// The 16-bit value held by the register pair starting at `reg`.
    pub fn register16(&self, reg: u8) -> u16 {
        let s = self.state.borrow();
        s.regs[reg as usize] as u16 | (s.regs[reg as usize + 1] as u16) << 8
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.state.borrow().sent.clone()
    }

    /// Every (register, value) data write, in order.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.state
            .borrow()
            .sent
            .iter()
            .filter_map(|s| match s {
                Sent::Write(reg, val) => Some((*reg, *val)),
                _ => None,
            })
            .collect()
    }

    /// The values written to `reg`, in order.
    pub fn writes_to(&self, reg: u8) -> Vec<u8> {
        self.writes()
            .into_iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| v)
            .collect()
    }

    /// How many times `reg` was read.
    pub fn reads_of(&self, reg: u8) -> usize {
        self.state
            .borrow()
            .sent
            .iter()
            .filter(|s| match s {
                Sent::Read(r, _) => *r == reg,
                _ => false,
            })
            .count()
    }

    /// Assert the data writes since the last clear, then clear.
    pub fn check_writes(&self, expected: &[(u8, u8)]) {
        assert_eq!(self.writes(), expected);
        self.clear();
    }

    pub fn clear(&self) {
        let mut s = self.state.borrow_mut();
        s.sent.clear();
        s.events.clear();
    }

    pub fn bus_events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn delays(&self) -> Vec<u16> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    /// The clock divider currently applied to the bus.
    pub fn clock(&self) -> Option<ClockDivider> {
        self.state.borrow().clock
    }

    pub fn fail_next_write(&mut self) {
        self.state.borrow_mut().fail_write = true;
    }

    pub fn fail_next_clock(&self) {
        self.state.borrow_mut().fail_clock = true;
    }

    pub fn fail_initialize(&self) {
        self.state.borrow_mut().fail_initialize = true;
    }
}

impl BusTransport for TestSpyBus {
    type Error = SpyError;

    fn initialize(&mut self, config: &BusConfig) -> Result<(), SpyError> {
        let mut s = self.state.borrow_mut();
        if s.fail_initialize {
            return Err(SpyError);
        }
        s.clock = Some(config.clock_divider);
        s.events.push(Event::Init(*config));
        Ok(())
    }

    fn deinitialize(&mut self) -> Result<(), SpyError> {
        let mut s = self.state.borrow_mut();
        s.clock = None;
        s.events.push(Event::Deinit);
        Ok(())
    }

    fn set_clock_divider(&mut self, divider: ClockDivider) -> Result<(), SpyError> {
        let mut s = self.state.borrow_mut();
        if s.fail_clock {
            s.fail_clock = false;
            return Err(SpyError);
        }
        s.clock = Some(divider);
        s.events.push(Event::Clock(divider));
        Ok(())
    }

    fn begin(&mut self) -> Result<(), SpyError> {
        let mut s = self.state.borrow_mut();
        s.selector = None;
        s.events.push(Event::Begin);
        Ok(())
    }

    fn end(&mut self) -> Result<(), SpyError> {
        let mut s = self.state.borrow_mut();
        s.selector = None;
        s.events.push(Event::End);
        Ok(())
    }

    fn write(&mut self, buf: &mut [u8], hold_select: bool) -> Result<(), SpyError> {
        let mut s = self.state.borrow_mut();
        if s.fail_write {
            s.fail_write = false;
            return Err(SpyError);
        }
        s.events.push(Event::Write(buf.to_vec(), hold_select));
        for byte in buf.iter_mut() {
            let selector = s.selector;
            *byte = match selector {
                None => {
                    s.selector = Some(*byte);
                    0
                }
                Some(selector) => s.payload(selector, *byte),
            };
        }
        Ok(())
    }
}

/// Reset line stand-in that logs its level changes.
pub struct TestPin {
    spy: TestSpyBus,
}

impl OutputPin for TestPin {
    type Error = SpyError;

    fn set_low(&mut self) -> Result<(), SpyError> {
        self.spy.state.borrow_mut().events.push(Event::Pin(false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SpyError> {
        self.spy.state.borrow_mut().events.push(Event::Pin(true));
        Ok(())
    }
}

/// Delay stand-in that logs instead of sleeping.
pub struct TestDelay {
    spy: TestSpyBus,
}

impl DelayMs<u16> for TestDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.spy.state.borrow_mut().events.push(Event::Delay(ms));
    }
}
