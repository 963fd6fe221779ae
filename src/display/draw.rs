//! Encoding of the hardware-accelerated drawing primitives into the drawing engine registers.

use crate::color::Rgb565;
use crate::command::consts::*;
use crate::command::{Command, RegWrite, COORD_MAX};
use crate::error::Error;
use crate::interface::DisplayInterface;

/// Geometry of a primitive. Coordinates are absolute display pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Rectangle between two corners, inclusive.
    Rect { x0: u16, y0: u16, x1: u16, y1: u16 },
    Circle { x: u16, y: u16, radius: u8 },
    /// Ellipse around a center with the horizontal (`long_axis`) and vertical (`short_axis`)
    /// semi-axes.
    Ellipse {
        x: u16,
        y: u16,
        long_axis: u16,
        short_axis: u16,
    },
    Triangle {
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
    },
    /// One quadrant of an ellipse. `part` (0-3) selects the quadrant.
    Curve {
        x: u16,
        y: u16,
        long_axis: u16,
        short_axis: u16,
        part: u8,
    },
}

/// The register and bits to poll until the engine that runs a primitive reports idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineStatus {
    pub register: u8,
    pub busy: u8,
}

/// One primitive draw request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCommand {
    pub shape: Shape,
    pub color: Rgb565,
    pub filled: bool,
}

impl DrawCommand {
    pub fn new(shape: Shape, color: Rgb565, filled: bool) -> Self {
        DrawCommand {
            shape,
            color,
            filled,
        }
    }

    pub fn rect(x0: u16, y0: u16, x1: u16, y1: u16, color: Rgb565, filled: bool) -> Self {
        Self::new(Shape::Rect { x0, y0, x1, y1 }, color, filled)
    }

    pub fn circle(x: u16, y: u16, radius: u8, color: Rgb565, filled: bool) -> Self {
        Self::new(Shape::Circle { x, y, radius }, color, filled)
    }

    pub fn ellipse(
        x: u16,
        y: u16,
        long_axis: u16,
        short_axis: u16,
        color: Rgb565,
        filled: bool,
    ) -> Self {
        Self::new(
            Shape::Ellipse {
                x,
                y,
                long_axis,
                short_axis,
            },
            color,
            filled,
        )
    }

    pub fn triangle(
        p0: (u16, u16),
        p1: (u16, u16),
        p2: (u16, u16),
        color: Rgb565,
        filled: bool,
    ) -> Self {
        Self::new(
            Shape::Triangle {
                x0: p0.0,
                y0: p0.1,
                x1: p1.0,
                y1: p1.1,
                x2: p2.0,
                y2: p2.1,
            },
            color,
            filled,
        )
    }

    pub fn curve(
        x: u16,
        y: u16,
        long_axis: u16,
        short_axis: u16,
        part: u8,
        color: Rgb565,
        filled: bool,
    ) -> Self {
        Self::new(
            Shape::Curve {
                x,
                y,
                long_axis,
                short_axis,
                part,
            },
            color,
            filled,
        )
    }

    /// Validate and encode the geometry registers of the shape.
    pub fn geometry<'b>(&self, buf: &'b mut [RegWrite; 6]) -> Result<&'b [RegWrite], ()> {
        use crate::command::RegWrite::{Byte, Word};

        let writes: &[RegWrite] = match self.shape {
            Shape::Rect { x0, y0, x1, y1 } => {
                *buf = [
                    Word(DLHSR0, x0),
                    Word(DLVSR0, y0),
                    Word(DLHER0, x1),
                    Word(DLVER0, y1),
                    Byte(0, 0),
                    Byte(0, 0),
                ];
                &buf[..4]
            }
            Shape::Circle { x, y, radius } => {
                buf[0] = Word(DCHR0, x);
                buf[1] = Word(DCVR0, y);
                buf[2] = Byte(DCRR, radius);
                &buf[..3]
            }
            Shape::Ellipse {
                x,
                y,
                long_axis,
                short_axis,
            }
            | Shape::Curve {
                x,
                y,
                long_axis,
                short_axis,
                ..
            } => {
                buf[0] = Word(DEHR0, x);
                buf[1] = Word(DEVR0, y);
                buf[2] = Word(ELL_A0, long_axis);
                buf[3] = Word(ELL_B0, short_axis);
                &buf[..4]
            }
            Shape::Triangle {
                x0,
                y0,
                x1,
                y1,
                x2,
                y2,
            } => {
                *buf = [
                    Word(DLHSR0, x0),
                    Word(DLVSR0, y0),
                    Word(DLHER0, x1),
                    Word(DLVER0, y1),
                    Word(DTPH0, x2),
                    Word(DTPV0, y2),
                ];
                &buf[..]
            }
        };
        let in_range = writes.iter().all(|w| match *w {
            Word(_, v) => v <= COORD_MAX,
            Byte(..) => true,
        });
        match self.shape {
            Shape::Curve { part, .. } if part > 3 => Err(()),
            _ if !in_range => Err(()),
            _ => Ok(writes),
        }
    }

    /// The engine control register, the value that starts this primitive, and the status to
    /// poll afterwards.
    pub fn start(&self) -> (u8, u8, EngineStatus) {
        let line_engine = EngineStatus {
            register: DCR,
            busy: DCR_LINESQUTRI_STATUS,
        };
        let ellipse_engine = EngineStatus {
            register: ELLIPSE,
            busy: ELLIPSE_STATUS,
        };
        let fill = if self.filled { DCR_FILL } else { DCR_NOFILL };
        match self.shape {
            Shape::Rect { .. } => (
                DCR,
                DCR_LINESQUTRI_START | DCR_DRAWSQUARE | fill,
                line_engine,
            ),
            Shape::Triangle { .. } => (
                DCR,
                DCR_LINESQUTRI_START | DCR_DRAWTRIANGLE | fill,
                line_engine,
            ),
            Shape::Circle { .. } => (
                DCR,
                DCR_CIRCLE_START | fill,
                EngineStatus {
                    register: DCR,
                    busy: DCR_CIRCLE_STATUS,
                },
            ),
            Shape::Ellipse { .. } => {
                let fill = if self.filled { ELLIPSE_FILL } else { 0 };
                (ELLIPSE, ELLIPSE_START | fill, ellipse_engine)
            }
            Shape::Curve { part, .. } => {
                let fill = if self.filled { ELLIPSE_FILL } else { 0 };
                (
                    ELLIPSE,
                    ELLIPSE_START | ELLIPSE_CURVE | fill | (part & 0x03),
                    ellipse_engine,
                )
            }
        }
    }

    /// Write geometry, then color, then the start command. Returns the status the caller must
    /// poll before the engine can accept another command. Nothing is sent if the geometry is out
    /// of range.
    pub fn send<DI>(&self, iface: &mut DI) -> Result<EngineStatus, Error<DI::Error>>
    where
        DI: DisplayInterface,
    {
        let mut buf = [RegWrite::Byte(0, 0); 6];
        let geometry = self.geometry(&mut buf).map_err(|_| Error::OutOfRange)?;
        for write in geometry {
            write.send(iface)?;
        }
        Command::SetForegroundColor(self.color).send(iface)?;
        let (reg, start, status) = self.start();
        iface.write_register(reg, start)?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::test_spy::TestSpyBus;
    use crate::interface::SpiInterface;

    fn spy() -> (TestSpyBus, SpiInterface<TestSpyBus>) {
        let spy = TestSpyBus::new();
        let di = SpiInterface::new(spy.split());
        (spy, di)
    }

    #[test]
    fn rect_filled() {
        let (spy, mut di) = spy();
        let status = DrawCommand::rect(10, 20, 300, 400, Rgb565::RED, true)
            .send(&mut di)
            .unwrap();
        assert_eq!(
            status,
            EngineStatus {
                register: DCR,
                busy: 0x80
            }
        );
        spy.check_writes(&[
            (DLHSR0, 10),
            (DLHSR0 + 1, 0),
            (DLVSR0, 20),
            (DLVSR0 + 1, 0),
            (DLHER0, 0x2C),
            (DLHER0 + 1, 0x01),
            (DLVER0, 0x90),
            (DLVER0 + 1, 0x01),
            (FGCR0, 0x1F),
            (FGCR0 + 1, 0x00),
            (FGCR0 + 2, 0x00),
            (DCR, 0xB0),
        ]);
    }

    #[test]
    fn circle_outline() {
        let (spy, mut di) = spy();
        let status = DrawCommand::circle(100, 50, 25, Rgb565::GREEN, false)
            .send(&mut di)
            .unwrap();
        assert_eq!(status.busy, DCR_CIRCLE_STATUS);
        assert_eq!(spy.register16(DCHR0), 100);
        assert_eq!(spy.register16(DCVR0), 50);
        assert_eq!(spy.register(DCRR), 25);
        assert_eq!(spy.writes_to(FGCR0 + 1), vec![0x3F]);
        assert_eq!(spy.writes_to(DCR), vec![0x40]);
    }

    #[test]
    fn ellipse_and_curve() {
        let (spy, mut di) = spy();
        DrawCommand::ellipse(400, 240, 100, 50, Rgb565::BLUE, true)
            .send(&mut di)
            .unwrap();
        assert_eq!(spy.register16(DEHR0), 400);
        assert_eq!(spy.register16(DEVR0), 240);
        assert_eq!(spy.register16(ELL_A0), 100);
        assert_eq!(spy.register16(ELL_B0), 50);
        DrawCommand::ellipse(400, 240, 100, 50, Rgb565::BLUE, false)
            .send(&mut di)
            .unwrap();
        DrawCommand::curve(400, 240, 100, 50, 2, Rgb565::BLUE, true)
            .send(&mut di)
            .unwrap();
        let status = DrawCommand::curve(400, 240, 100, 50, 3, Rgb565::BLUE, false)
            .send(&mut di)
            .unwrap();
        assert_eq!(spy.writes_to(ELLIPSE), vec![0xC0, 0x80, 0xD2, 0x93]);
        assert_eq!(
            status,
            EngineStatus {
                register: ELLIPSE,
                busy: 0x80
            }
        );
    }

    #[test]
    fn triangle_points() {
        let (spy, mut di) = spy();
        DrawCommand::triangle((0, 0), (799, 0), (400, 479), Rgb565::WHITE, false)
            .send(&mut di)
            .unwrap();
        assert_eq!(spy.register16(DLHER0), 799);
        assert_eq!(spy.register16(DTPH0), 400);
        assert_eq!(spy.register16(DTPV0), 479);
        assert_eq!(spy.writes_to(DCR), vec![0x81]);
    }

    #[test]
    fn rejects_before_sending() {
        let (spy, mut di) = spy();
        assert_eq!(
            DrawCommand::rect(0, 0, 1024, 10, Rgb565::RED, true).send(&mut di),
            Err(Error::OutOfRange)
        );
        assert_eq!(
            DrawCommand::curve(10, 10, 5, 5, 4, Rgb565::RED, true).send(&mut di),
            Err(Error::OutOfRange)
        );
        assert!(spy.sent().is_empty());
    }
}
