//! Point cloud window drawn with plotters on top of piston.

use std::time::{Duration, Instant};

use piston_window::{EventLoop, PistonWindow, Window, WindowSettings};
use plotters::drawing::IntoDrawingArea;
use plotters::prelude::{ChartBuilder, Circle, BLUE, RED, WHITE};
use plotters::style::Color;
use plotters_piston::{draw_piston_window, PistonBackend};

use crate::config::ViewConfig;
use crate::error::{Error, Result};
use crate::sink::{DisplaySink, SinkState};
use crate::transform::FrameBuffer;

const ORIGIN_MARKER_SIZE: u32 = 6;

pub struct PlotWindow {
    window: PistonWindow,
    view: ViewConfig,
    points: Vec<(f64, f64)>,
}

impl PlotWindow {
    pub fn open(view: &ViewConfig) -> Result<PlotWindow> {
        let mut window: PistonWindow =
            WindowSettings::new(view.title.clone(), [view.window_size, view.window_size])
                .exit_on_esc(true)
                .build()
                .map_err(|e| Error::Display(format!("Failed to open the window: {}", e)))?;
        window.set_max_fps(view.max_fps);

        Ok(PlotWindow {
            window,
            view: view.clone(),
            points: Vec::new(),
        })
    }
}

fn draw(
    b: PistonBackend,
    points: &[(f64, f64)],
    view: &ViewConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = b.into_drawing_area();
    root.fill(&WHITE)?;

    let range = view.range_m;
    let mut cc = ChartBuilder::on(&root)
        .caption(&view.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(30)
        .build_cartesian_2d(-range..range, -range..range)?;
    cc.configure_mesh().x_desc("X (m)").y_desc("Y (m)").draw()?;

    let size = view.point_size;
    let circles = points
        .iter()
        .map(|(x, y)| Circle::new((*x, *y), size, BLUE.mix(0.7).filled()));
    cc.draw_series(circles)?;

    // the sensor itself
    cc.draw_series(std::iter::once(Circle::new(
        (0., 0.),
        ORIGIN_MARKER_SIZE,
        RED.filled(),
    )))?;

    Ok(())
}

impl DisplaySink for PlotWindow {
    fn show_points(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.points = frame.points().iter().map(|p| (p.x, p.y)).collect();
        Ok(())
    }

    fn pause(&mut self, interval: Duration) -> Result<SinkState> {
        let deadline = Instant::now() + interval;
        loop {
            let points = &self.points;
            let view = &self.view;
            if draw_piston_window(&mut self.window, |b| draw(b, points, view)).is_none() {
                return Ok(SinkState::Closed);
            }
            if Instant::now() >= deadline {
                return Ok(SinkState::Open);
            }
        }
    }

    fn close(&mut self) {
        self.window.set_should_close(true);
    }
}
